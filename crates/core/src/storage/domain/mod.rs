pub mod evidence_store;
