//! # CLI Module
//!
//! The `signpost` binary: inspect a route manifest from the shell.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List every registered route with its name and action:
//!
//! ```bash
//! signpost routes --manifest routes.yaml
//! ```
//!
//! ### `match`
//!
//! Match a request and print the bound parameters. Unknown paths and wrong
//! verbs exit with the routing error:
//!
//! ```bash
//! signpost match --manifest routes.yaml --method GET --path /users/7
//! signpost match --manifest routes.yaml --path /dashboard --host acme.example.com
//! ```
//!
//! ### `url`
//!
//! Generate the URL for a named route. With `--key` (or `SIGNPOST_APP_KEY`)
//! the URL is signed, and `--expires-in` makes it temporary:
//!
//! ```bash
//! signpost url --manifest routes.yaml --name users.show --param user=7 --param tab=posts
//! signpost url --manifest routes.yaml --name unsubscribe --param user=7 --key secret --expires-in 3600
//! ```
//!
//! ### `compile`
//!
//! Export the compiled table as JSON, for loading with
//! [`crate::manifest::load_compiled`]:
//!
//! ```bash
//! signpost compile --manifest routes.yaml --out routes.compiled.json
//! ```

mod commands;


pub use commands::{execute, run_cli, Cli, Commands};
