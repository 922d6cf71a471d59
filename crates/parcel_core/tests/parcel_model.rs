use parcel_core::{Parcel, ParcelStatus};
use serde_json::json;

#[test]
fn parcel_serializes_status_as_plain_label() {
    let parcel = Parcel {
        number: 3,
        client: 1000,
        status: ParcelStatus::Sent,
        address: "test".to_string(),
        created_at: "2024-01-01T00:00:00Z".to_string(),
    };

    let value = serde_json::to_value(&parcel).unwrap();
    assert_eq!(
        value,
        json!({
            "number": 3,
            "client": 1000,
            "status": "sent",
            "address": "test",
            "created_at": "2024-01-01T00:00:00Z"
        })
    );
}

#[test]
fn unknown_status_label_survives_deserialization() {
    let parcel: Parcel = serde_json::from_value(json!({
        "number": 1,
        "client": 2,
        "status": "held_at_customs",
        "address": "port",
        "created_at": "2024-05-01T12:30:00+03:00"
    }))
    .unwrap();

    assert_eq!(
        parcel.status,
        ParcelStatus::Other("held_at_customs".to_string())
    );
    parcel.validate().unwrap();
    assert_eq!(
        serde_json::to_value(&parcel).unwrap()["status"],
        "held_at_customs"
    );
}
