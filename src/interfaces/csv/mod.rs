pub mod transaction_log_writer;
