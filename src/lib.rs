//! Connection configuration builder for Elasticsearch-Hadoop export jobs
//!
//! # Usage
//!
//! Assemble connector options for a secured cluster
//! ```rust
//! use es_export_job::EsExportJob;
//!
//! let job = EsExportJob::builder()
//!     .hosts("https://es.example.com")
//!     .username("foo")
//!     .password("bar")
//!     .build();
//! assert_eq!(job.conf.get("es.nodes"), Some("es.example.com:443".to_string()));
//! assert_eq!(job.conf.get("es.net.ssl"), Some("true".to_string()));
//! ```
//!
//! Pick up the process-wide TLS store settings
//! ```rust,no_run
//! use es_export_job::{EsExportJob, TlsSettings};
//!
//! let job = EsExportJob::builder()
//!     .hosts("1.1.1.1:9200")
//!     .tls(TlsSettings::from_env())
//!     .build();
//! ```
pub mod config;
pub(crate) mod error;
pub mod job;

pub use config::{parse_hosts, JobConfig, TlsSettings};
pub use error::EsJobError;
pub use error::Result;
pub use job::{EsExportJob, JobBuilder};
