// UWS Infrastructure - Object Storage Adapter
// Implements: ResultSigner

mod result_signer;

pub use result_signer::S3ResultSigner;
