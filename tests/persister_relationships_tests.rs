
use fake_server::{FakeServer, manager};
use serde_json::json;
use webmapper::webservice::HttpMethod;
use webmapper::{MapperError, Transfer, TransferRef, Value};

#[test]
fn test_end_to_end_belongs_to_creation() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let author = TransferRef::new(Transfer::new("User").with("name", "ann"));
    let post = TransferRef::new(
        Transfer::new("Post")
            .with("title", "hello")
            .with_one("author", &author),
    );

    manager.persist(&post).unwrap();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["POST /users", "POST /posts"]);
    assert_eq!(server.body(0).unwrap(), json!({"id": null, "name": "ann"}));
    assert_eq!(server.body(1).unwrap()["author_id"], json!(1));
    assert_eq!(post.get("author_id"), Value::Integer(1));
    assert!(!manager.unit_of_work().is_new(&post).unwrap());
    assert!(!manager.unit_of_work().is_new(&author).unwrap());
}

#[test]
fn test_independent_roots_created_in_persist_order() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let first = TransferRef::new(Transfer::new("Post").with("title", "first"));
    let second = TransferRef::new(Transfer::new("Post").with("title", "second"));
    manager.persist(&first).unwrap();
    manager.persist(&second).unwrap();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["POST /posts", "POST /posts"]);
    assert_eq!(server.body(0).unwrap()["title"], json!("first"));
    assert_eq!(server.body(1).unwrap()["title"], json!("second"));
    assert_eq!(first.get("id"), Value::Integer(1));
    assert_eq!(second.get("id"), Value::Integer(2));
}

#[test]
fn test_has_one_receives_owner_id() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let profile = TransferRef::new(Transfer::new("Profile").with("bio", "hi"));
    let user = TransferRef::new(Transfer::new("User").with("name", "ann").with_one("profile", &profile));
    manager.persist(&user).unwrap();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["POST /users", "POST /profiles"]);
    assert_eq!(server.body(1).unwrap()["user_id"], json!(1));
    assert_eq!(profile.get("user_id"), Value::Integer(1));
}

#[test]
fn test_text_foreign_key_stores_iri() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let post = TransferRef::new(Transfer::new("Post").with("title", "reviewed"));
    let review = TransferRef::new(Transfer::new("Review").with_one("reviewed", &post));
    manager.persist(&review).unwrap();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["POST /posts", "POST /reviews"]);
    assert_eq!(server.body(1).unwrap()["post"], json!("/posts/1"));
    assert!(!manager.unit_of_work().is_dirty(&review).unwrap());
}

#[test]
fn test_composite_relation_takes_owner_fields() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let cell = TransferRef::new(Transfer::new("Cell").with("name", "a1"));
    let sheet = TransferRef::new(
        Transfer::new("Sheet")
            .with("x", 1)
            .with("y", 2)
            .with_one("cell", &cell),
    );
    manager.persist(&sheet).unwrap();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["POST /cells", "POST /sheets"]);
    let cell_body = server.body(0).unwrap();
    assert_eq!(cell_body["x"], json!(1));
    assert_eq!(cell_body["y"], json!(2));
    assert!(manager.unit_of_work().fetch("Cell", &Value::Text("x=1;y=2".into())).is_some());
}

#[test]
fn test_iri_collection_saves_members_first() {
    let server = FakeServer::new();
    server.seed("/tags", json!({"id": 10, "name": "rust"}));
    let manager = manager(&server);

    let known = manager.find("Tag", 10).unwrap().unwrap();
    let fresh = TransferRef::new(Transfer::new("Tag").with("name", "orm"));
    let article = TransferRef::new(Transfer::new("Article").with_many("tag_list", vec![known, fresh]));
    server.clear_log();

    manager.persist(&article).unwrap();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["POST /tags", "POST /articles"]);
    assert_eq!(server.body(1).unwrap()["tags"], json!(["/tags/10", "/tags/11"]));
}

#[test]
fn test_two_way_graph_saved_from_the_child() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let post = TransferRef::new(Transfer::new("Post").with("title", "hello"));
    let comment = TransferRef::new(Transfer::new("Comment").with("body", "first!").with_one("post", &post));
    post.set_related_many("comments", vec![comment.clone()]);

    manager.persist(&comment).unwrap();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["POST /posts", "POST /comments"]);
    assert_eq!(server.body(1).unwrap()["post_id"], json!(1));
    assert_eq!(comment.get("post_id"), Value::Integer(1));
    assert!(manager.contains(&post));
    assert!(!manager.unit_of_work().is_dirty(&comment).unwrap());
}

#[test]
fn test_mutual_belongs_to_between_new_objects_fails() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let shipment = TransferRef::new(Transfer::new("Shipment"));
    let receipt = TransferRef::new(Transfer::new("Receipt").with_one("shipment", &shipment));
    shipment.set_related("receipt", Some(receipt));

    manager.persist(&shipment).unwrap();
    let err = manager.flush().unwrap_err();

    assert!(matches!(
        err,
        MapperError::RelationshipCycle { ref type_name, ref property }
            if type_name == "Receipt" && property == "shipment"
    ));
    assert!(server.log().is_empty());
    assert!(manager.unit_of_work().is_new(&shipment).unwrap());
}

#[test]
fn test_clean_objects_are_not_written() {
    let server = FakeServer::new();
    server.seed("/posts", json!({"id": 5, "title": "a", "author_id": null}));
    let manager = manager(&server);

    let post = manager.find("Post", 5).unwrap().unwrap();
    server.clear_log();

    manager.flush().unwrap();
    assert!(server.log().is_empty());

    post.set("title", "b");
    manager.flush().unwrap();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["PUT /posts/5"]);
    assert_eq!(server.items("/posts")[0]["title"], json!("b"));
}

#[test]
fn test_new_children_of_clean_parent_get_its_id() {
    let server = FakeServer::new();
    server.seed("/posts", json!({"id": 5, "title": "a", "author_id": null}));
    let manager = manager(&server);

    let post = manager.find("Post", 5).unwrap().unwrap();
    let comment = TransferRef::new(Transfer::new("Comment").with("body", "first!"));
    post.set_related_many("comments", vec![comment.clone()]);
    server.clear_log();

    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["POST /comments"]);
    assert_eq!(server.body(0).unwrap()["post_id"], json!(5));
    assert!(manager.contains(&comment));
}

#[test]
fn test_remove_deletes_and_detaches() {
    let server = FakeServer::new();
    server.seed("/posts", json!({"id": 5, "title": "a", "author_id": null}));
    let manager = manager(&server);

    let post = manager.find("Post", 5).unwrap().unwrap();
    manager.remove(&post).unwrap();
    server.clear_log();
    manager.flush().unwrap();

    assert_eq!(server.log(), vec!["DELETE /posts/5"]);
    assert!(server.items("/posts").is_empty());
    assert!(manager.unit_of_work().is_detached(&post));
}

#[test]
fn test_removing_unsaved_object_sends_nothing() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let draft = TransferRef::new(Transfer::new("Post").with("title", "draft"));
    manager.persist(&draft).unwrap();
    manager.remove(&draft).unwrap();
    manager.flush().unwrap();

    assert!(server.log().is_empty());
    assert!(!manager.contains(&draft));
}

#[test]
fn test_remove_untracked_object_fails() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let stranger = TransferRef::new(Transfer::new("Post").with("id", 9));
    assert!(matches!(
        manager.remove(&stranger),
        Err(MapperError::UnmanagedObject(_))
    ));
}

#[test]
fn test_write_error_aborts_flush() {
    let server = FakeServer::new();
    server.fail(HttpMethod::Post, "/users", 422);
    let manager = manager(&server);

    let author = TransferRef::new(Transfer::new("User").with("name", "ann"));
    let post = TransferRef::new(Transfer::new("Post").with_one("author", &author));
    manager.persist(&post).unwrap();

    let err = manager.flush().unwrap_err();
    match err {
        MapperError::Webservice(response) => assert_eq!(response.status(), 422),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(server.log(), vec!["POST /users"]);
    assert!(manager.unit_of_work().is_new(&post).unwrap());
}
