pub mod wad_server;
