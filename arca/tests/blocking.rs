// Blocking clients run their own runtime, so these are plain `#[test]`s.

mod common;

use arca::{
    Order, Settings,
    blocking::Client,
    mongodb::bson::doc,
};
use common::{TestModel, database_name, init_tracing, model, test_model, url};

fn client() -> Client {
    init_tracing();

    Client::connect(&Settings::new(url(), database_name())).unwrap()
}

#[test]
fn validation_matches_async_operations() {
    let client = client();
    let mongo = client.mongo();

    let delete = mongo.delete(arca::UntypedFilter::<TestModel>::new(doc! {}));
    let update = mongo.update(
        test_model::filter! { text: "any" },
        test_model::TypedUpdate::default(),
    );
    let insert = mongo.insert_many::<TestModel>(&[]);

    assert!(delete.unwrap_err().is_invalid_argument());
    assert!(update.unwrap_err().is_invalid_argument());
    assert!(insert.unwrap_err().is_invalid_argument());
}

#[test]
#[ignore]
fn blocking_round_trip() {
    let client = client();
    let mongo = client.mongo();

    let mut models = (0..3)
        .map(|i| model(i, &format!("blocking-{i}")))
        .collect::<Vec<_>>();
    mongo.insert_many(&models).unwrap();

    models[0].text = "renamed".into();
    assert_eq!(mongo.save(&models[0]).unwrap(), 1);

    let texts = mongo
        .query::<TestModel>()
        .sort(test_model::Fields::Number, Order::Asc)
        .to_vec()
        .unwrap()
        .into_iter()
        .map(|model| model.text)
        .collect::<Vec<_>>();
    assert_eq!(texts, ["renamed", "blocking-1", "blocking-2"]);

    let modified = mongo
        .update(
            test_model::filter! { number: Gte(&1) },
            test_model::update! { text: "bumped".to_owned() },
        )
        .unwrap();
    assert_eq!(modified, 2);

    assert_eq!(mongo.remove(&models[1]).unwrap(), 1);
    assert_eq!(mongo.remove(&models[1]).unwrap(), 0);
    assert!(mongo.exists(test_model::filter! { text: "bumped" }).unwrap());
    assert_eq!(
        mongo.delete(test_model::filter! { number: Lte(&2) }).unwrap(),
        2
    );
    assert_eq!(mongo.query::<TestModel>().first().unwrap(), None);
}

#[test]
fn async_and_blocking_operations_share_a_scope() {
    use arca::Entity;

    let client = client();
    let mongo = client.mongo();

    assert_eq!(TestModel::identifier().unwrap().name, "_id");
    assert!(
        mongo
            .insert_many::<TestModel>(&[])
            .unwrap_err()
            .is_invalid_argument()
    );
    assert!(
        mongo
            .delete::<TestModel>(test_model::TypedFilter::default())
            .unwrap_err()
            .is_invalid_argument()
    );
}
