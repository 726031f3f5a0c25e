// Every test in this binary runs under C# legacy UUIDs; conventions are process-wide.

mod common;

use arca::{
    Conventions, Entity, IdFilter, IdKind, UuidFormat,
    mongodb::bson::{self, Bson, spec::BinarySubtype},
};
use common::{TestModel, client_with, model, test_model};

const LEGACY: Conventions = Conventions {
    uuid_format: UuidFormat::CSharpLegacy,
    date_time_kind: arca::DateTimeKind::Utc,
};

fn register() {
    LEGACY.register().unwrap();
}

#[test]
fn identifiers_are_stored_in_the_legacy_layout() {
    register();
    let entity = model(1, "legacy");

    let document = bson::to_document(&entity).unwrap();

    let Some(Bson::Binary(binary)) = document.get("_id") else {
        panic!("expected a binary identifier");
    };
    assert_eq!(binary.subtype, BinarySubtype::UuidOld);
    assert_eq!(UuidFormat::CSharpLegacy.decode(binary).unwrap(), entity.id);

    let decoded: TestModel = bson::from_document(document).unwrap();
    assert_eq!(decoded, entity);
}

#[test]
fn identifier_filter_uses_the_legacy_tag() {
    register();
    let entity = model(2, "tagged");

    let filter = IdFilter::for_entity(&entity).unwrap();

    assert_eq!(filter.kind(), IdKind::Uuid);
    assert_eq!(
        filter.to_json(UuidFormat::CSharpLegacy).unwrap(),
        format!(r#"{{"_id":CSUUID("{}")}}"#, entity.id)
    );
    assert!(
        filter
            .to_json(UuidFormat::Standard)
            .unwrap_err()
            .is_configuration()
    );
}

#[test]
fn filter_values_are_normalized() {
    register();
    let entity = model(3, "normalized");

    let by_id = arca::by_id::<TestModel>(entity.id);
    let typed = test_model::filter! { id: &entity.id };

    let expected = Bson::Binary(UuidFormat::CSharpLegacy.encode(entity.id));
    assert_eq!(
        arca::Filter::to_document(&by_id).unwrap().get("_id"),
        Some(&expected)
    );
    assert_eq!(
        arca::Filter::<TestModel>::to_document(&typed)
            .unwrap()
            .get_document("_id")
            .unwrap()
            .get("$eq"),
        Some(&expected)
    );
}

#[tokio::test]
async fn switching_conventions_is_refused() {
    register();

    let err = Conventions::default().register().unwrap_err();

    assert!(err.is_configuration());
    assert_eq!(Conventions::current(), LEGACY);
}

#[tokio::test]
#[ignore]
async fn legacy_identifiers_round_trip_through_the_server() {
    let client = client_with(LEGACY).await;
    let mongo = client.mongo();
    let mut entity = model(4, "stored");
    entity.insert(mongo).await.unwrap();

    entity.text = "saved".into();

    assert_eq!(entity.save(mongo).await.unwrap(), 1);
    assert_eq!(
        TestModel::count(mongo, test_model::filter! { id: &entity.id })
            .await
            .unwrap(),
        1
    );
    assert_eq!(entity.remove(mongo).await.unwrap(), 1);

    client.database().drop().await.unwrap();
}
