//! Protocol buffer types for Terraform Plugin Protocol v6
//!
//! The code is generated at build time by tonic_build from
//! `proto/tfplugin6.proto`. Request/Response pairs live in snake_case modules
//! named after their RPC (e.g. `read_resource::Request`), nested messages in
//! sub-modules (e.g. `diagnostic::Severity`).
//!
//! Several protobuf types share names with framework types, so always refer
//! to them through the `proto::` prefix.

pub mod tfplugin6 {
    tonic::include_proto!("tfplugin6");
}

pub use tfplugin6::*;

pub use provider_server::{Provider as ProviderService, ProviderServer};
