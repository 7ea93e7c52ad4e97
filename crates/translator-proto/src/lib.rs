//! Generated gRPC client stubs for the remote translation service
//! (spec.md §6). The server side is an external collaborator and is
//! intentionally not generated here (`build_server(false)`).

pub mod v1 {
    tonic::include_proto!("translator.v1");
}
