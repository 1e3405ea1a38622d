pub mod fingerprint;

pub use fingerprint::FingerprintCache;
