pub mod repository;

use sqlx::migrate::Migrator;

/// Schema migrations for the assessment tables.
///
/// Versions are timestamps so they stay clear of an indexer's sequential
/// versions when both share one database, and versions applied by that
/// indexer are ignored instead of failing the run.
pub fn migrator() -> Migrator {
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrator_tolerates_shared_database() {
        let migrator = migrator();
        assert!(migrator.ignore_missing);
        assert!(migrator.iter().count() > 0);
        // timestamp versions, never the 1, 2, 3... of a sequential scheme
        assert!(migrator.iter().all(|m| m.version >= 20_000_000_000_000));
    }
}
