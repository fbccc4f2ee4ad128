use std::env;

use log::info;

use es_export_job::config::ES_NODES;
use es_export_job::{EsExportJob, Result, TlsSettings};

const ES_HOSTS: &str = "ES_HOSTS";
const ES_USERNAME: &str = "ES_USERNAME";
const ES_PASSWORD: &str = "ES_PASSWORD";
const ES_INDEX: &str = "ES_INDEX";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let mut builder = EsExportJob::builder()
        .hosts(env::var(ES_HOSTS).unwrap_or_else(|_| "127.0.0.1:9200".to_string()))
        .tls(TlsSettings::from_env());

    if let Ok(username) = env::var(ES_USERNAME) {
        builder = builder.username(username);
    }
    if let Ok(password) = env::var(ES_PASSWORD) {
        builder = builder.password(password);
    }
    if let Ok(index) = env::var(ES_INDEX) {
        builder = builder.index(index);
    }

    let job = builder.build();
    info!(
        "Running export against {}",
        job.conf.get(ES_NODES).unwrap_or_default()
    );

    job.run().await
}
