// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! An in-memory catalog server speaking the metacat wire protocol, for
//! demos and manual testing. Authentication is not negotiated: connect to it
//! with a credential-less client.

use bytes::Bytes;
use clap::Parser;
use futures::{SinkExt, StreamExt};
use metacat::proto::{CatalogRequest, CatalogResponse, Database, Role, ServerError, ServerErrorKind, Table};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::LengthDelimitedCodec;
use tracing::{info, warn};

#[derive(Parser)]
struct Flags {
    /// Sets the address to listen on.
    #[clap(long, default_value = "127.0.0.1:9083")]
    listen_addr: SocketAddr,
}

#[derive(Default)]
struct Catalog {
    databases: HashMap<String, Database>,
    tables: HashMap<(String, String), Table>,
    roles: HashMap<String, Role>,
}

fn not_found(what: impl Into<String>) -> CatalogResponse {
    CatalogResponse::Error(ServerError {
        kind: ServerErrorKind::NotFound,
        message: what.into(),
    })
}

fn already_exists(what: impl Into<String>) -> CatalogResponse {
    CatalogResponse::Error(ServerError {
        kind: ServerErrorKind::AlreadyExists,
        message: what.into(),
    })
}

fn respond(catalog: &Mutex<Catalog>, request: CatalogRequest) -> CatalogResponse {
    let mut catalog = match catalog.lock() {
        Ok(catalog) => catalog,
        Err(poisoned) => poisoned.into_inner(),
    };
    match request {
        CatalogRequest::GetAllDatabases {} => {
            let mut names: Vec<String> = catalog.databases.keys().cloned().collect();
            names.sort();
            CatalogResponse::Names(names)
        },
        CatalogRequest::GetDatabases { pattern } => {
            let mut names: Vec<String> = catalog.databases.keys().filter(|name| name.contains(&pattern)).cloned().collect();
            names.sort();
            CatalogResponse::Names(names)
        },
        CatalogRequest::GetDatabase { name } => match catalog.databases.get(&name) {
            Some(database) => CatalogResponse::Database(database.clone()),
            None => not_found(format!("database `{name}`")),
        },
        CatalogRequest::CreateDatabase { database } => {
            if catalog.databases.contains_key(&database.name) {
                return already_exists(format!("database `{}`", database.name));
            }
            catalog.databases.insert(database.name.clone(), database);
            CatalogResponse::Unit(())
        },
        CatalogRequest::AlterDatabase { name, database } => {
            if !catalog.databases.contains_key(&name) {
                return not_found(format!("database `{name}`"));
            }
            catalog.databases.remove(&name);
            catalog.databases.insert(database.name.clone(), database);
            CatalogResponse::Unit(())
        },
        CatalogRequest::DropDatabase { name, .. } => match catalog.databases.remove(&name) {
            Some(_) => {
                catalog.tables.retain(|(db, _), _| db != &name);
                CatalogResponse::Unit(())
            },
            None => not_found(format!("database `{name}`")),
        },
        CatalogRequest::GetAllTables { db_name } => {
            let mut names: Vec<String> = catalog.tables.keys().filter(|(db, _)| db == &db_name).map(|(_, table)| table.clone()).collect();
            names.sort();
            CatalogResponse::Names(names)
        },
        CatalogRequest::GetTable { db_name, table_name } => match catalog.tables.get(&(db_name.clone(), table_name.clone())) {
            Some(table) => CatalogResponse::Table(table.clone()),
            None => not_found(format!("table `{db_name}.{table_name}`")),
        },
        CatalogRequest::CreateTable { table } => {
            let key = (table.db_name.clone(), table.table_name.clone());
            if !catalog.databases.contains_key(&table.db_name) {
                return not_found(format!("database `{}`", table.db_name));
            }
            if catalog.tables.contains_key(&key) {
                return already_exists(format!("table `{}.{}`", table.db_name, table.table_name));
            }
            catalog.tables.insert(key, table);
            CatalogResponse::Unit(())
        },
        CatalogRequest::DropTable { db_name, table_name, .. } => match catalog.tables.remove(&(db_name.clone(), table_name.clone())) {
            Some(_) => CatalogResponse::Unit(()),
            None => not_found(format!("table `{db_name}.{table_name}`")),
        },
        CatalogRequest::GetRoleNames {} => {
            let mut names: Vec<String> = catalog.roles.keys().cloned().collect();
            names.sort();
            CatalogResponse::Names(names)
        },
        CatalogRequest::CreateRole { name, owner } => {
            if catalog.roles.contains_key(&name) {
                return CatalogResponse::Flag(false);
            }
            catalog.roles.insert(
                name.clone(),
                Role {
                    role_name: name,
                    create_time: 0,
                    owner_name: owner,
                },
            );
            CatalogResponse::Flag(true)
        },
        CatalogRequest::DropRole { name } => CatalogResponse::Flag(catalog.roles.remove(&name).is_some()),
        other => CatalogResponse::Error(ServerError {
            kind: ServerErrorKind::Internal,
            message: format!("the demo server does not implement {other:?}"),
        }),
    }
}

async fn handle(stream: TcpStream, catalog: Arc<Mutex<Catalog>>) -> anyhow::Result<()> {
    let mut framed = LengthDelimitedCodec::builder().new_framed(stream);
    while let Some(frame) = framed.next().await {
        let request: CatalogRequest = bincode::deserialize(&frame?)?;
        let response = respond(&catalog, request);
        framed.send(Bytes::from(bincode::serialize(&response)?)).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::parse();
    service::init_tracing("metacat demo server")?;

    let catalog = Arc::new(Mutex::new(Catalog::default()));
    let listener = TcpListener::bind(flags.listen_addr).await?;
    info!(listen_addr = %flags.listen_addr, "catalog server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let catalog = Arc::clone(&catalog);
        tokio::spawn(async move {
            if let Err(error) = handle(stream, catalog).await {
                warn!(%peer, %error, "connection ended with an error");
            }
        });
    }
}
