//! # psbrowser - interactive pub/sub node browser
//!
//! A command shell for exploring and managing the node hierarchy of a
//! publish/subscribe service. The user types filesystem-like commands
//! (`ls`, `cd`, `mkdir`, `rm`, `subscribe`, ...) and each one becomes a
//! request to the service; the shell waits for the reply before showing the
//! next prompt.
//!
//! ## Components
//!
//! - **Parser**: splits a line into a command and quoted parameters
//! - **Registry**: command names, minimum parameter counts and help text
//! - **Request builder**: turns commands into protocol requests
//! - **Router**: single-flight completion engine with timeout
//! - **Session**: actor identity, target service and the working node
//! - **Transport**: TCP gateway client and an in-memory double
//!
//! ## Usage as Library
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use psbrowser::router::Router;
//! use psbrowser::session::Session;
//! use psbrowser::shell::{ScriptedInput, Shell};
//! use psbrowser::transport::{Credentials, TcpTransport, authenticate};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = Credentials {
//!         jid: "alice@example.org".into(),
//!         password: "secret".into(),
//!     };
//!     let (transport, mut events) =
//!         TcpTransport::connect("127.0.0.1", 5222, &credentials, 1 << 20).await?;
//!     authenticate(&transport, &mut events, Duration::from_secs(10)).await?;
//!
//!     let session = Session::new("alice@example.org", "pubsub.example.org");
//!     let router = Router::new(transport, Duration::from_secs(30));
//!     let mut shell = Shell::new(session, router, std::io::stdout());
//!     shell.run(&mut ScriptedInput::new(["ls", "cd news", "ls"])).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod parser;
pub mod protocol;
pub mod registry;
pub mod request;
pub mod router;
pub mod session;
pub mod shell;
pub mod transport;

pub use config::{CliOptions, Config, ResolvedParams};
pub use error::{ParseError, RegistryError, RouterError, TransportError};
pub use router::{Resolution, Router};
pub use session::Session;
pub use shell::Shell;
pub use transport::{MemoryTransport, TcpTransport, Transport};

/// Crate version, as reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
