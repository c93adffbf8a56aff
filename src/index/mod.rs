pub mod record_index;
