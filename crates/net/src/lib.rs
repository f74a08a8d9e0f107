pub mod chat;
pub mod conn;
pub mod error;
pub mod io;
pub mod join;
pub mod key;
pub mod login;
pub mod mojang;
pub mod preamble;
pub mod server;
pub mod session;
pub mod worker;
