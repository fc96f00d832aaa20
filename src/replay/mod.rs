mod route;
pub mod server;

pub use route::Route;
pub use server::run_replay;
