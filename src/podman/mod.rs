//! Container runtime inspection through the `podman` CLI.

pub mod inspect;
pub mod logs;

pub use inspect::{
    verify_containers, ContainerInspect, ContainerInspector, PodInspect, VerifyOutcome,
};
pub use logs::contains_readiness_keyword;
