// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! A demo client: connects through the failover pool, creates a database and
//! a table, and reads them back.

use clap::Parser;
use metacat::proto::{Database, FieldSchema, Table};
use metacat::Client;
use tracing::info;

#[derive(Parser)]
struct Flags {
    /// Comma-separated endpoint list to rotate over.
    #[clap(long, default_value = "thrift://127.0.0.1:9083")]
    dsn: String,
    /// Name of the demo database to create.
    #[clap(long, default_value = "demo")]
    database: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::parse();
    service::init_tracing("metacat demo client")?;

    let client = Client::from_dsn(flags.dsn)?;
    let mut session = client.connect().await?;
    info!(endpoint = %session.endpoint(), "connected");

    session
        .create_database(Database {
            name: flags.database.clone(),
            description: "metacat demo database".to_string(),
            location_uri: format!("file:///tmp/{}", flags.database),
            ..Database::default()
        })
        .await?;

    session
        .create_table(Table {
            db_name: flags.database.clone(),
            table_name: "events".to_string(),
            owner: "demo".to_string(),
            columns: vec![
                FieldSchema {
                    name: "id".to_string(),
                    type_name: "bigint".to_string(),
                    comment: String::new(),
                },
                FieldSchema {
                    name: "payload".to_string(),
                    type_name: "string".to_string(),
                    comment: String::new(),
                },
            ],
            table_type: "MANAGED_TABLE".to_string(),
            ..Table::default()
        })
        .await?;

    let databases = session.get_all_databases().await?;
    info!(?databases, "databases");

    let tables = session.get_all_tables(flags.database.clone()).await?;
    info!(?tables, "tables");

    let table = session.get_table(flags.database.clone(), "events".to_string()).await?;
    info!(table = table.table_name, columns = table.columns.len(), "fetched table");

    session.close().await?;
    Ok(())
}
