//! # samp-query
//!
//! Request info, rules and the player list from SA-MP servers over UDP.
//!
//! Example
//! ```rust,no_run
//! use samp_query::*;
//! use std::time::Duration;
//!
//! env_logger::init();
//! let options = QueryOptions::new("127.0.0.1")
//!     .port(7777)
//!     .timeout(Duration::from_millis(500));
//! let server = query(&options).unwrap();
//! println!("{} ({}/{})", server.hostname, server.online, server.maxplayers);
//! for player in &server.players {
//!     println!("{:>3} {} score={} ping={}", player.id, player.name, player.score, player.ping);
//! }
//! ```
//! Example to poll several servers at once:
//! ```rust,no_run
//! use samp_query::*;
//!
//! let servers: Vec<QueryOptions> = ["51.68.204.178:7777", "91.134.166.73"]
//!     .iter()
//!     .map(|s| s.parse().unwrap())
//!     .collect();
//! for res in query_all(&servers) {
//!     match res {
//!         Ok(server) => println!("{}: {}", server.address, server.hostname),
//!         Err(e) => println!("error: {}", e),
//!     }
//! }
//! ```

pub mod errors;

mod common;
mod parser;
mod query;
mod transport;
mod util;

pub use common::*;
pub use errors::{RequestError, ResponseKind};
pub use parser::*;
pub use query::*;
pub use transport::*;
pub use util::{create_packet, create_ping_packet, Opcode, HEADER_SIZE, MAGIC};
