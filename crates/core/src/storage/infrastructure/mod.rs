pub mod fs_evidence_store;
