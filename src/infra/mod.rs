pub mod azure_datalake;
pub mod csv_export;
pub mod http_client;
pub mod local_lake;
pub mod sas;
