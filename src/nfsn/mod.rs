//! NearlyFreeSpeech.NET API client.

mod client;
mod records;
mod response;
mod signer;


pub use client::{encode_form, NfsnClient};
pub use records::DnsService;
pub use response::ApiResponse;
pub use signer::{sign_with, RequestSigner, AUTH_HEADER};
