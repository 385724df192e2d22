// Copyright Andeya Lee 2024
//
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.
//!
//! Wire-level definition of the catalog RPC protocol.
//!
//! This module mirrors the catalog service's schema one to one: entity
//! shapes, the request/response frames, and the error envelope. The
//! connection layer treats all of it as given: it validates nothing here
//! beyond what decoding itself enforces.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Principal kinds known to the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalType {
    /// An individual user.
    #[default]
    User,
    /// A user group.
    Group,
    /// A role.
    Role,
}

/// A database entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Database name, unique within the catalog.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Root storage location of the database.
    pub location_uri: String,
    /// Arbitrary key/value properties.
    pub parameters: HashMap<String, String>,
    /// Owning principal, when recorded.
    pub owner_name: Option<String>,
    /// Kind of the owning principal.
    pub owner_type: Option<PrincipalType>,
}

/// One column of a table schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Column name.
    pub name: String,
    /// Type name in the catalog's type grammar.
    pub type_name: String,
    /// Free-form column comment.
    pub comment: String,
}

/// A table entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Name of the owning database.
    pub db_name: String,
    /// Table name, unique within its database.
    pub table_name: String,
    /// Owning principal.
    pub owner: String,
    /// Creation time, seconds since the epoch.
    pub create_time: i64,
    /// Last access time, seconds since the epoch.
    pub last_access_time: i64,
    /// Column schema.
    pub columns: Vec<FieldSchema>,
    /// Partitioning columns.
    pub partition_keys: Vec<FieldSchema>,
    /// Storage location of the table data.
    pub location_uri: String,
    /// Arbitrary key/value properties.
    pub parameters: HashMap<String, String>,
    /// Table kind, e.g. `MANAGED_TABLE` or `EXTERNAL_TABLE`.
    pub table_type: String,
}

/// Summary row returned by table-metadata enumeration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    /// Name of the owning database.
    pub db_name: String,
    /// Table name.
    pub table_name: String,
    /// Table kind.
    pub table_type: String,
    /// Free-form table comment, when recorded.
    pub comments: Option<String>,
}

/// A role definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Role name, unique within the catalog.
    pub role_name: String,
    /// Creation time, seconds since the epoch.
    pub create_time: i64,
    /// Principal that owns the role.
    pub owner_name: String,
}

/// Object kinds a privilege can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// The catalog as a whole.
    Global,
    /// A database.
    Database,
    /// A table.
    Table,
    /// A single partition of a table.
    Partition,
    /// A single column.
    Column,
}

/// Reference to a catalog object in privilege operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Kind of the referenced object.
    pub object_type: ObjectType,
    /// Database the object lives in, when applicable.
    pub db_name: String,
    /// Name of the referenced object.
    pub object_name: String,
    /// Partition values, for partition-scoped references.
    pub part_values: Vec<String>,
    /// Column name, for column-scoped references.
    pub column_name: Option<String>,
}

/// Details of one privilege grant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivilegeGrantInfo {
    /// Privilege name, e.g. `SELECT`.
    pub privilege: String,
    /// Grant time, seconds since the epoch.
    pub create_time: i64,
    /// Principal that issued the grant.
    pub grantor: String,
    /// Kind of the granting principal.
    pub grantor_type: PrincipalType,
    /// Whether the grantee may grant the privilege onward.
    pub grant_option: bool,
}

/// A privilege attached to an object for one principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPrivilege {
    /// The object the privilege applies to.
    pub object: ObjectRef,
    /// Principal holding the privilege.
    pub principal_name: String,
    /// Kind of the holding principal.
    pub principal_type: PrincipalType,
    /// Grant details.
    pub grant_info: PrivilegeGrantInfo,
}

/// Privileges on one object grouped by user, group and role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrivilegeSet {
    /// Privileges granted directly to users.
    pub user_privileges: HashMap<String, Vec<PrivilegeGrantInfo>>,
    /// Privileges granted to groups.
    pub group_privileges: HashMap<String, Vec<PrivilegeGrantInfo>>,
    /// Privileges granted to roles.
    pub role_privileges: HashMap<String, Vec<PrivilegeGrantInfo>>,
}

/// One role membership edge between a role and a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePrincipalGrant {
    /// The granted role.
    pub role_name: String,
    /// The principal holding the grant.
    pub principal_name: String,
    /// Kind of the holding principal.
    pub principal_type: PrincipalType,
    /// Whether the grantee may grant the role onward.
    pub grant_option: bool,
    /// Grant time, seconds since the epoch.
    pub grant_time: i64,
    /// Principal that issued the grant.
    pub grantor_name: String,
    /// Kind of the granting principal.
    pub grantor_type: PrincipalType,
}

/// Error classes the catalog server reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerErrorKind {
    /// The referenced object does not exist.
    NotFound,
    /// The object to create already exists.
    AlreadyExists,
    /// The server rejected the request arguments.
    InvalidInput,
    /// The server failed internally.
    Internal,
}

impl fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerErrorKind::NotFound => "not found",
            ServerErrorKind::AlreadyExists => "already exists",
            ServerErrorKind::InvalidInput => "invalid input",
            ServerErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// An application-level failure reported by the catalog server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ServerError {
    /// Error class.
    pub kind: ServerErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// A single catalog RPC request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogRequest {
    /// Lists every database name.
    GetAllDatabases {},
    /// Lists database names matching a pattern.
    GetDatabases {
        /// Glob-style name pattern.
        pattern: String,
    },
    /// Fetches one database entry.
    GetDatabase {
        /// Database name.
        name: String,
    },
    /// Creates a database.
    CreateDatabase {
        /// The entry to create.
        database: Database,
    },
    /// Replaces a database entry.
    AlterDatabase {
        /// Name of the database to replace.
        name: String,
        /// The replacement entry.
        database: Database,
    },
    /// Drops a database.
    DropDatabase {
        /// Database name.
        name: String,
        /// Whether the stored data is deleted as well.
        delete_data: bool,
        /// Whether contained tables are dropped too.
        cascade: bool,
    },
    /// Lists every table name in a database.
    GetAllTables {
        /// Database name.
        db_name: String,
    },
    /// Lists table names in a database matching a pattern.
    GetTables {
        /// Database name.
        db_name: String,
        /// Glob-style name pattern.
        pattern: String,
    },
    /// Enumerates table metadata summaries across databases.
    GetTableMeta {
        /// Glob-style database name patterns.
        db_patterns: String,
        /// Glob-style table name patterns.
        table_patterns: String,
        /// Table kinds to include; empty means all.
        table_types: Vec<String>,
    },
    /// Fetches one table entry.
    GetTable {
        /// Database name.
        db_name: String,
        /// Table name.
        table_name: String,
    },
    /// Creates a table.
    CreateTable {
        /// The entry to create.
        table: Table,
    },
    /// Replaces a table entry.
    AlterTable {
        /// Database name.
        db_name: String,
        /// Name of the table to replace.
        table_name: String,
        /// The replacement entry.
        table: Table,
    },
    /// Drops a table.
    DropTable {
        /// Database name.
        db_name: String,
        /// Table name.
        table_name: String,
        /// Whether the stored data is deleted as well.
        delete_data: bool,
    },
    /// Enumerates partition names of a table.
    GetPartitionNames {
        /// Database name.
        db_name: String,
        /// Table name.
        table_name: String,
        /// Upper bound on returned names; negative means no bound.
        max_parts: i16,
    },
    /// Lists every role name.
    GetRoleNames {},
    /// Creates a role.
    CreateRole {
        /// Role name.
        name: String,
        /// Owning principal.
        owner: String,
    },
    /// Drops a role.
    DropRole {
        /// Role name.
        name: String,
    },
    /// Lists the roles granted to a principal.
    ListRoles {
        /// Principal name.
        principal_name: String,
        /// Principal kind.
        principal_type: PrincipalType,
    },
    /// Lists the privileges a principal holds on an object.
    ListPrivileges {
        /// Principal name.
        principal_name: String,
        /// Principal kind.
        principal_type: PrincipalType,
        /// The object to inspect.
        object: ObjectRef,
    },
    /// Resolves the effective privilege set on an object for a user and its
    /// groups.
    GetPrivilegeSet {
        /// The object to inspect.
        object: ObjectRef,
        /// User name.
        user: String,
        /// Groups the user belongs to.
        groups: Vec<String>,
    },
    /// Lists the principals granted a role.
    GetPrincipalsInRole {
        /// Role name.
        role_name: String,
    },
    /// Lists the role grants held by a principal.
    GetRoleGrantsForPrincipal {
        /// Principal name.
        principal_name: String,
        /// Principal kind.
        principal_type: PrincipalType,
    },
    /// Grants a role to a principal.
    GrantRole {
        /// Role name.
        role_name: String,
        /// Grantee principal name.
        principal_name: String,
        /// Grantee principal kind.
        principal_type: PrincipalType,
        /// Granting principal name.
        grantor_name: String,
        /// Granting principal kind.
        grantor_type: PrincipalType,
    },
}

/// A single catalog RPC response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogResponse {
    /// A list of object names.
    Names(Vec<String>),
    /// A full database entry.
    Database(Database),
    /// A full table entry.
    Table(Table),
    /// Table metadata summaries.
    TableMetas(Vec<TableMeta>),
    /// Full role entries.
    Roles(Vec<Role>),
    /// Privileges bound to an object.
    Privileges(Vec<ObjectPrivilege>),
    /// A grouped privilege set.
    PrivilegeSet(PrivilegeSet),
    /// Role membership edges.
    Grants(Vec<RolePrincipalGrant>),
    /// Outcome flag of a create/drop/grant style operation.
    Flag(bool),
    /// Acknowledgement carrying no payload.
    Unit(()),
    /// The server failed the request.
    Error(ServerError),
}
