//! # nfsn-dns
//!
//! Dynamic DNS and ACME `dns-01` helper for the NearlyFreeSpeech.NET API.
//!
//! ## Features
//!
//! - Signed API client for the `/dns/{domain}` record operations
//! - Public IP detection over HTTP echo services or a DNS TXT query
//! - A/AAAA reconciliation with a confirmation read
//! - TXT challenge hooks for ACME clients
//! - Zone file export
//!
//! ## Usage
//!
//! ```bash
//! # Point www.example.com at the current public IP
//! USERNAME=me API_KEY=... DOMAIN=example.com SUBDOMAIN=www nfsn-dns update
//!
//! # ACME hook
//! nfsn-dns auth <token> _acme-challenge
//! nfsn-dns cleanup _acme-challenge
//!
//! # Dump the zone
//! nfsn-dns export example.com.zone
//! ```

pub mod acme;
pub mod config;
pub mod detector;
pub mod error;
pub mod nfsn;
pub mod reconcile;
pub mod record;
pub mod zone;

pub use config::{Config, Credentials};
pub use detector::{IpResolver, IpSource, IpVersion, ResolveMethod};
pub use error::{NfsnError, Result};
pub use reconcile::{ReconcileEngine, ReconcileResult};
pub use record::{RecordType, ResourceRecord};
