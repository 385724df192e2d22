// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! A live catalog session: one opened transport, one bound stub, and
//! passthrough catalog calls.

use super::stub::{CatalogStub, RpcError};
use super::{ClientError, Shared};
use crate::context::Context;
use crate::endpoint::Endpoint;
use crate::proto::{
    CatalogRequest, CatalogResponse, Database, ObjectPrivilege, ObjectRef, PrincipalType, PrivilegeSet, Role,
    RolePrincipalGrant, Table, TableMeta,
};
use std::sync::Arc;

/// One open catalog connection paired with a bound RPC stub and the context
/// scoping its calls.
///
/// Sessions are produced only by a successful [`Client::connect`](super::Client::connect)
/// and owned by the caller. The transport is exclusive to the session for its
/// lifetime; callers must [`close`](Session::close) exactly once on their own
/// termination path.
#[derive(Debug)]
pub struct Session {
    stub: CatalogStub,
    context: Context,
    shared: Arc<Shared>,
}

impl Session {
    pub(crate) fn new(stub: CatalogStub, context: Context, shared: Arc<Shared>) -> Self {
        Self { stub, context, shared }
    }

    /// The endpoint this session is bound to.
    pub fn endpoint(&self) -> &Endpoint {
        self.stub.endpoint()
    }

    /// The execution context attached to every call.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Replaces the execution context used to scope subsequent calls.
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    /// Releases the transport.
    ///
    /// Not idempotent: a second close surfaces [`RpcError::Closed`], as does
    /// any further catalog call.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.stub.close().await.map_err(Into::into)
    }

    /// Establishes an independent session from the same client configuration.
    ///
    /// This re-runs the full connection procedure, so round-robin may land
    /// the new session on a different endpoint. Nothing is shared with this
    /// session's transport.
    pub async fn duplicate(&self) -> Result<Session, ClientError> {
        Shared::connect(&self.shared).await
    }
}

/// Generates the forwarding surface from the protocol table: each method
/// binds its arguments into the paired request frame, issues the call, and
/// unwraps the expected response variant. Nothing else happens here.
macro_rules! forward_catalog {
    ($(
        $(#[$attr:meta])*
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty { $request:ident => $response:ident }
    )*) => {
        impl Session {
            $(
                $(#[$attr])*
                pub async fn $name(&mut self, $($arg: $ty),*) -> Result<$ret, ClientError> {
                    let request = CatalogRequest::$request { $($arg),* };
                    match self.stub.call(&self.context, request).await? {
                        CatalogResponse::$response(value) => Ok(value),
                        CatalogResponse::Error(error) => Err(RpcError::Server(error).into()),
                        _ => Err(RpcError::UnexpectedResponse(stringify!($name)).into()),
                    }
                }
            )*
        }
    };
}

forward_catalog! {
    /// Lists every database name.
    fn get_all_databases() -> Vec<String> { GetAllDatabases => Names }

    /// Lists database names matching `pattern`.
    fn get_databases(pattern: String) -> Vec<String> { GetDatabases => Names }

    /// Fetches one database entry.
    fn get_database(name: String) -> Database { GetDatabase => Database }

    /// Creates a database.
    fn create_database(database: Database) -> () { CreateDatabase => Unit }

    /// Replaces the database entry stored under `name`.
    fn alter_database(name: String, database: Database) -> () { AlterDatabase => Unit }

    /// Drops a database.
    fn drop_database(name: String, delete_data: bool, cascade: bool) -> () { DropDatabase => Unit }

    /// Lists every table name in a database.
    fn get_all_tables(db_name: String) -> Vec<String> { GetAllTables => Names }

    /// Lists table names in a database matching `pattern`.
    fn get_tables(db_name: String, pattern: String) -> Vec<String> { GetTables => Names }

    /// Enumerates table metadata summaries across databases.
    fn get_table_meta(db_patterns: String, table_patterns: String, table_types: Vec<String>) -> Vec<TableMeta> { GetTableMeta => TableMetas }

    /// Fetches one table entry.
    fn get_table(db_name: String, table_name: String) -> Table { GetTable => Table }

    /// Creates a table.
    fn create_table(table: Table) -> () { CreateTable => Unit }

    /// Replaces the table entry stored under `db_name`.`table_name`.
    fn alter_table(db_name: String, table_name: String, table: Table) -> () { AlterTable => Unit }

    /// Drops a table.
    fn drop_table(db_name: String, table_name: String, delete_data: bool) -> () { DropTable => Unit }

    /// Enumerates partition names of a table, at most `max_parts` of them.
    fn get_partition_names(db_name: String, table_name: String, max_parts: i16) -> Vec<String> { GetPartitionNames => Names }

    /// Lists every role name.
    fn get_role_names() -> Vec<String> { GetRoleNames => Names }

    /// Creates a role owned by `owner`.
    fn create_role(name: String, owner: String) -> bool { CreateRole => Flag }

    /// Drops a role.
    fn drop_role(name: String) -> bool { DropRole => Flag }

    /// Lists the roles granted to a principal.
    fn list_roles(principal_name: String, principal_type: PrincipalType) -> Vec<Role> { ListRoles => Roles }

    /// Lists the privileges a principal holds on an object.
    fn list_privileges(principal_name: String, principal_type: PrincipalType, object: ObjectRef) -> Vec<ObjectPrivilege> { ListPrivileges => Privileges }

    /// Resolves the effective privilege set on an object for a user and its
    /// groups.
    fn get_privilege_set(object: ObjectRef, user: String, groups: Vec<String>) -> PrivilegeSet { GetPrivilegeSet => PrivilegeSet }

    /// Lists the principals granted a role.
    fn get_principals_in_role(role_name: String) -> Vec<RolePrincipalGrant> { GetPrincipalsInRole => Grants }

    /// Lists the role grants held by a principal.
    fn get_role_grants_for_principal(principal_name: String, principal_type: PrincipalType) -> Vec<RolePrincipalGrant> { GetRoleGrantsForPrincipal => Grants }

    /// Grants a role to a principal on behalf of `grantor_name`.
    fn grant_role(role_name: String, principal_name: String, principal_type: PrincipalType, grantor_name: String, grantor_type: PrincipalType) -> bool { GrantRole => Flag }
}
