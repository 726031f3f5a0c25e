// Argument checks run before any round trip, so these tests need no server.

mod common;

use arca::{Entity, UntypedFilter, UntypedUpdate, mongodb::bson::doc};
use common::{TestModel, client, model, test_model};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Entity)]
struct Draft {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    title: String,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
#[entity(collection = "labels")]
struct Label {
    #[entity(id)]
    code: String,
    text: String,
}

#[tokio::test]
async fn entity_without_identifier_value() {
    let client = client().await;
    let draft = Draft {
        id: None,
        title: "untitled".into(),
    };

    assert!(draft.save(client.mongo()).await.unwrap_err().is_invalid_argument());
    assert!(draft.remove(client.mongo()).await.unwrap_err().is_invalid_argument());
}

#[test]
fn marked_identifier_is_used() {
    let label = Label {
        code: "L-1".into(),
        text: "first".into(),
    };

    let filter = arca::IdFilter::for_entity(&label).unwrap();

    assert_eq!(filter.to_document(), doc! { "code": "L-1" });
    assert_eq!(Label::collection_name(), "labels");
}

#[tokio::test]
async fn bulk_operations_need_a_predicate() {
    let client = client().await;
    let mongo = client.mongo();

    let delete = TestModel::delete(mongo, test_model::TypedFilter::default()).await;
    let update = TestModel::update(
        mongo,
        UntypedFilter::new(doc! {}),
        test_model::update! { number: 1 },
    )
    .await;

    assert!(delete.unwrap_err().is_invalid_argument());
    assert!(update.unwrap_err().is_invalid_argument());
}

#[tokio::test]
async fn update_must_set_something() {
    let client = client().await;
    let mongo = client.mongo();

    let typed = TestModel::update(
        mongo,
        test_model::filter! { text: "any" },
        test_model::TypedUpdate::default(),
    )
    .await;
    let untyped = TestModel::update(
        mongo,
        test_model::filter! { text: "any" },
        UntypedUpdate::new(doc! { "$set": {} }),
    )
    .await;

    assert!(typed.unwrap_err().is_invalid_argument());
    assert!(untyped.unwrap_err().is_invalid_argument());
}

#[tokio::test]
async fn insert_many_needs_entities() {
    let client = client().await;

    let err = TestModel::insert_many(client.mongo(), &[]).await.unwrap_err();

    assert!(err.is_invalid_argument());
}

#[test]
fn typed_documents_use_adapters() {
    let entity = model(3, "typed");

    let filter = arca::Filter::<TestModel>::to_document(&test_model::filter! {
        id: &entity.id,
        stamp: Lte(&entity.stamp),
    })
    .unwrap();

    assert_eq!(filter.get_document("_id").unwrap(), &doc! { "$eq": entity.id });
    assert!(
        filter
            .get_document("stamp")
            .unwrap()
            .get_datetime("$lte")
            .is_ok()
    );

    let update = arca::Update::<TestModel>::to_document(&test_model::update! {
        stamp: entity.stamp,
    })
    .unwrap();

    assert!(update.get_document("$set").unwrap().get_datetime("stamp").is_ok());
}
