use parcel_core::db::open_db_in_memory;
use parcel_core::{
    ClientId, Parcel, ParcelNumber, ParcelService, ParcelStatus, ParcelStore, RepoError,
    RepoResult, SqliteParcelStore, WriteOutcome,
};

/// Store whose reads are followed by a status change from another writer.
struct InterleavedWriterStore<'conn> {
    inner: SqliteParcelStore<'conn>,
    concurrent_status: ParcelStatus,
}

impl ParcelStore for InterleavedWriterStore<'_> {
    fn add(&self, parcel: &Parcel) -> RepoResult<ParcelNumber> {
        self.inner.add(parcel)
    }

    fn get(&self, number: ParcelNumber) -> RepoResult<Parcel> {
        let parcel = self.inner.get(number)?;
        self.inner.set_status(number, &self.concurrent_status)?;
        Ok(parcel)
    }

    fn get_by_client(&self, client: ClientId) -> RepoResult<Vec<Parcel>> {
        self.inner.get_by_client(client)
    }

    fn set_status(&self, number: ParcelNumber, status: &ParcelStatus) -> RepoResult<WriteOutcome> {
        self.inner.set_status(number, status)
    }

    fn advance_status(
        &self,
        number: ParcelNumber,
        from: &ParcelStatus,
        to: &ParcelStatus,
    ) -> RepoResult<WriteOutcome> {
        self.inner.advance_status(number, from, to)
    }

    fn set_address(&self, number: ParcelNumber, address: &str) -> RepoResult<WriteOutcome> {
        self.inner.set_address(number, address)
    }

    fn delete(&self, number: ParcelNumber) -> RepoResult<WriteOutcome> {
        self.inner.delete(number)
    }
}

#[test]
fn register_persists_registered_parcel_with_timestamp() {
    let conn = open_db_in_memory().unwrap();
    let service = ParcelService::new(SqliteParcelStore::try_new(&conn).unwrap());

    let registered = service.register(1000, "Pushkin st. 10").unwrap();
    assert!(registered.number > 0);
    assert_eq!(registered.status, ParcelStatus::Registered);
    registered.validate().unwrap();

    let listed = service.client_parcels(1000).unwrap();
    assert_eq!(listed, vec![registered]);
}

#[test]
fn next_status_walks_lifecycle_and_stops_at_delivered() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let service = ParcelService::new(SqliteParcelStore::try_new(&conn).unwrap());
    let number = service.register(1, "a").unwrap().number;

    assert_eq!(service.next_status(number).unwrap(), WriteOutcome::Applied);
    assert_eq!(store.get(number).unwrap().status, ParcelStatus::Sent);

    assert_eq!(service.next_status(number).unwrap(), WriteOutcome::Applied);
    assert_eq!(store.get(number).unwrap().status, ParcelStatus::Delivered);

    assert_eq!(
        service.next_status(number).unwrap(),
        WriteOutcome::PreconditionFailed
    );
    assert_eq!(store.get(number).unwrap().status, ParcelStatus::Delivered);
}

#[test]
fn next_status_leaves_unknown_labels_untouched() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let number = store
        .add(&Parcel {
            status: ParcelStatus::from("lost"),
            ..Parcel::new(2, "b")
        })
        .unwrap();
    let service = ParcelService::new(store);

    assert_eq!(
        service.next_status(number).unwrap(),
        WriteOutcome::PreconditionFailed
    );
}

#[test]
fn next_status_on_missing_parcel_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ParcelService::new(SqliteParcelStore::try_new(&conn).unwrap());

    let err = service.next_status(404).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(404)));
}

#[test]
fn change_address_and_delete_only_apply_while_registered() {
    let conn = open_db_in_memory().unwrap();
    let service = ParcelService::new(SqliteParcelStore::try_new(&conn).unwrap());
    let kept = service.register(3, "old").unwrap().number;
    let cancelled = service.register(3, "gone").unwrap().number;

    assert_eq!(
        service.change_address(kept, "new").unwrap(),
        WriteOutcome::Applied
    );
    assert_eq!(service.delete(cancelled).unwrap(), WriteOutcome::Applied);

    service.next_status(kept).unwrap();
    assert_eq!(
        service.change_address(kept, "newer").unwrap(),
        WriteOutcome::PreconditionFailed
    );
    assert_eq!(
        service.delete(kept).unwrap(),
        WriteOutcome::PreconditionFailed
    );

    let remaining = service.client_parcels(3).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].number, kept);
    assert_eq!(remaining[0].address, "new");
}

#[test]
fn next_status_does_not_overwrite_a_concurrent_change() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteParcelStore::try_new(&conn).unwrap();
    let number = store.add(&Parcel::new(4, "c")).unwrap();

    let service = ParcelService::new(InterleavedWriterStore {
        inner: SqliteParcelStore::try_new(&conn).unwrap(),
        concurrent_status: ParcelStatus::from("returned"),
    });

    assert_eq!(
        service.next_status(number).unwrap(),
        WriteOutcome::PreconditionFailed
    );
    assert_eq!(
        store.get(number).unwrap().status,
        ParcelStatus::from("returned")
    );
}
