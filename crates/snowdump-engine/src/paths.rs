//! Output path allocation
//!
//! Layout: `<root>/<target ddl folder>/<database>/<schema>/<kind folder>/<file>.sql`,
//! every segment below the root lower-cased. The file system is the only
//! record of which paths are taken.
//!
//! Database, schema and object names are quoted identifiers and may contain
//! anything. Each one is encoded into a single path segment: `%`, `/` and `\`
//! become `%25`, `%2f` and `%5c`, and a bare `.` or `..` has its dots encoded.
//! The target's DDL folder comes from validated config and is used as is.

use snowdump_core::{DumpError, ObjectKind, SchemaObject};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "sql";
const DUPLICATE_MARKER: &str = "_duplicate";

/// Lower-case `name` and encode it so it stays one path segment
pub fn encode_segment(name: &str) -> String {
    let lower = name.to_lowercase();
    if lower == "." || lower == ".." {
        return lower.replace('.', "%2e");
    }

    let mut encoded = String::with_capacity(lower.len());
    for c in lower.chars() {
        match c {
            '%' => encoded.push_str("%25"),
            '/' => encoded.push_str("%2f"),
            '\\' => encoded.push_str("%5c"),
            c => encoded.push(c),
        }
    }
    encoded
}

/// `<ddl folder>/<encoded segments...>`
fn relative_path(ddl_folder: &str, segments: &[&str]) -> PathBuf {
    let mut path: PathBuf = ddl_folder.to_lowercase().split('/').collect();
    for segment in segments {
        path.push(encode_segment(segment));
    }
    path
}

/// Where a definition will be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedPath {
    pub path: PathBuf,

    /// The natural path was taken and a `_duplicate<ts>` suffix was added
    pub duplicate: bool,
}

/// Computes and creates output folders and file paths under a fixed root
#[derive(Debug, Clone)]
pub struct PathAllocator {
    root: PathBuf,
}

impl PathAllocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind_folder(kind: ObjectKind) -> &'static str {
        kind.folder()
    }

    /// Path of a coarse folder, without touching the disk
    pub fn sub_folder_path(&self, ddl_folder: &str, segments: &[&str]) -> PathBuf {
        self.root.join(relative_path(ddl_folder, segments))
    }

    /// Create `<root>/<ddl folder>/<segments...>`. Fails with
    /// [`DumpError::FolderAlreadyExists`] if it is already there: two
    /// targets, databases or schemas mapping to one folder is a naming clash.
    pub fn create_sub_folder(&self, ddl_folder: &str, segments: &[&str]) -> Result<PathBuf, DumpError> {
        let path = self.sub_folder_path(ddl_folder, segments);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| DumpError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // create_dir (not create_dir_all) so concurrent creators cannot both succeed
        match fs::create_dir(&path) {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(DumpError::FolderAlreadyExists(path)),
            Err(source) => Err(DumpError::Io { path, source }),
        }
    }

    /// Folder for objects of `kind` in `database.schema`, created if missing
    pub fn object_folder(
        &self,
        ddl_folder: &str,
        database: &str,
        schema: &str,
        kind: ObjectKind,
    ) -> Result<PathBuf, DumpError> {
        let folder = self
            .root
            .join(relative_path(ddl_folder, &[database, schema]))
            .join(Self::kind_folder(kind));

        fs::create_dir_all(&folder).map_err(|source| DumpError::Io {
            path: folder.clone(),
            source,
        })?;

        Ok(folder)
    }

    /// File for `object`, creating its folder. If the natural path exists the
    /// stem gets `_duplicate<unix seconds>`; two collisions in the same
    /// second resolve to the same path.
    pub fn file_path(
        &self,
        ddl_folder: &str,
        database: &str,
        schema: &str,
        object: &SchemaObject,
    ) -> Result<AllocatedPath, DumpError> {
        let folder = self.object_folder(ddl_folder, database, schema, object.kind)?;
        Ok(resolve_collision(&folder, object, chrono::Utc::now().timestamp()))
    }

    /// Write a definition verbatim
    pub fn write_definition(&self, path: &Path, ddl: &str) -> Result<(), DumpError> {
        fs::write(path, ddl).map_err(|source| DumpError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn file_name(stem: &str) -> String {
    format!("{}.{}", stem, EXTENSION)
}

fn resolve_collision(folder: &Path, object: &SchemaObject, now: i64) -> AllocatedPath {
    let stem = encode_segment(&object.file_stem());
    let natural = folder.join(file_name(&stem));

    if !natural.exists() {
        return AllocatedPath {
            path: natural,
            duplicate: false,
        };
    }

    AllocatedPath {
        path: folder.join(file_name(&format!("{}{}{}", stem, DUPLICATE_MARKER, now))),
        duplicate: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn allocator() -> (TempDir, PathAllocator) {
        let dir = TempDir::new().unwrap();
        let paths = PathAllocator::new(dir.path());
        (dir, paths)
    }

    #[test]
    fn kind_folders() {
        let folders: Vec<_> = ObjectKind::ALL.iter().map(|k| PathAllocator::kind_folder(*k)).collect();
        assert_eq!(
            folders,
            vec!["tables", "views", "functions", "procedures", "sequences", "pipes"]
        );
    }

    #[test]
    fn file_path_is_lower_cased_and_deterministic() {
        let (dir, paths) = allocator();
        let object = SchemaObject::plain("Orders", ObjectKind::Table);

        let first = paths.file_path("Prod/ddl", "SALES", "PUBLIC", &object).unwrap();
        let second = paths.file_path("Prod/ddl", "SALES", "PUBLIC", &object).unwrap();

        assert_eq!(first, second);
        assert!(!first.duplicate);
        assert_eq!(first.path, dir.path().join("prod/ddl/sales/public/tables/orders.sql"));
        assert!(dir.path().join("prod/ddl/sales/public/tables").is_dir());
    }

    #[test]
    fn callables_include_signature() {
        let (dir, paths) = allocator();
        let object = SchemaObject::new("ADD", ObjectKind::Function, "(A NUMBER, B NUMBER)");

        let allocated = paths.file_path("prod", "DB", "S", &object).unwrap();
        assert_eq!(
            allocated.path,
            dir.path().join("prod/db/s/functions/add(number, number).sql")
        );
    }

    #[test]
    fn collision_gets_duplicate_suffix() {
        let (dir, paths) = allocator();
        let object = SchemaObject::plain("T", ObjectKind::Table);

        let natural = paths.file_path("prod", "DB", "S", &object).unwrap();
        paths.write_definition(&natural.path, "create table t").unwrap();

        let folder = dir.path().join("prod/db/s/tables");
        let resolved = resolve_collision(&folder, &object, 1_700_000_000);
        assert!(resolved.duplicate);
        assert_eq!(resolved.path, folder.join("t_duplicate1700000000.sql"));
        assert!(!resolved.path.exists());

        let allocated = paths.file_path("prod", "DB", "S", &object).unwrap();
        assert!(allocated.duplicate);
        assert_ne!(allocated.path, natural.path);
        assert!(allocated.path.to_string_lossy().contains(DUPLICATE_MARKER));
        assert!(!allocated.path.exists());
    }

    #[test]
    fn object_folder_is_idempotent() {
        let (_dir, paths) = allocator();
        let first = paths.object_folder("prod", "DB", "S", ObjectKind::View).unwrap();
        let second = paths.object_folder("prod", "DB", "S", ObjectKind::View).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn sub_folder_twice_is_rejected() {
        let (dir, paths) = allocator();

        let created = paths.create_sub_folder("Prod", &["DB", "S"]).unwrap();
        assert_eq!(created, dir.path().join("prod/db/s"));

        let err = paths.create_sub_folder("prod", &["db", "s"]).unwrap_err();
        assert!(matches!(err, DumpError::FolderAlreadyExists(p) if p == created));
    }

    #[test]
    fn names_are_encoded_into_one_segment() {
        assert_eq!(encode_segment("A/B"), "a%2fb");
        assert_eq!(encode_segment("a\\b"), "a%5cb");
        assert_eq!(encode_segment("50%"), "50%25");
        assert_eq!(encode_segment(".."), "%2e%2e");
        assert_eq!(encode_segment("."), "%2e");
        assert_eq!(encode_segment("..X"), "..x");
        assert_eq!(encode_segment("F(NUMBER, VARCHAR)"), "f(number, varchar)");
    }

    #[test]
    fn hostile_names_stay_below_the_kind_folder() {
        let (dir, paths) = allocator();
        let kind_folder = dir.path().join("prod/%2e%2e/%2e%2e/tables");

        let object = SchemaObject::plain("../../x", ObjectKind::Table);
        let allocated = paths.file_path("prod", "..", "..", &object).unwrap();

        assert_eq!(allocated.path, kind_folder.join("..%2f..%2fx.sql"));
        assert_eq!(allocated.path.parent(), Some(kind_folder.as_path()));
        assert!(kind_folder.is_dir());
    }

    #[test]
    fn sub_folder_segments_are_encoded() {
        let (dir, paths) = allocator();
        let created = paths.create_sub_folder("prod/ddl", &["A/B"]).unwrap();
        assert_eq!(created, dir.path().join("prod/ddl/a%2fb"));
    }

    #[test]
    fn write_failure_names_path() {
        let (dir, paths) = allocator();
        let path = dir.path().join("missing/folder/t.sql");

        let err = paths.write_definition(&path, "x").unwrap_err();
        assert!(matches!(err, DumpError::Write { path: p, .. } if p == path));
    }
}
