//! # CLI Module
//!
//! The `objroute` binary binds a small set of demo service objects and lets
//! you inspect the resulting route table or dispatch requests against it.
//!
//! ```bash
//! objroute routes
//! objroute call GET '/user/show?name=ada'
//! objroute call GET /user --repeat 3
//! objroute --config server.yaml routes
//! ```

mod commands;
mod demo;


pub use commands::{demo_server, format_routes, run_cli, Cli, Commands};
pub use demo::{bind_demo, ArticleRest, UserService};
