
use fake_server::{FakeServer, manager};
use serde_json::json;
use webmapper::{MapperError, ProxyFactory, Transfer, TransferRef, Value};

#[test]
fn test_belongs_to_fetched_once() {
    let server = FakeServer::new();
    server.seed("/users", json!({"id": 1, "name": "ann"}));
    server.seed("/posts", json!({"id": 5, "title": "a", "author_id": 1}));
    let manager = manager(&server);

    let post = manager.find("Post", 5).unwrap().unwrap();
    assert!(post.is_proxy());
    assert_eq!(server.log(), vec!["GET /posts/5"]);

    let author = post.related("author").unwrap().unwrap();
    let again = post.related("author").unwrap().unwrap();
    assert!(author.ptr_eq(&again));
    assert_eq!(author.get("name"), Value::Text("ann".into()));
    assert_eq!(server.log(), vec!["GET /posts/5", "GET /users/1"]);

    let same = manager.find("User", 1).unwrap().unwrap();
    assert!(same.ptr_eq(&author));
    assert_eq!(server.log().len(), 2);
}

#[test]
fn test_has_many_filters_by_owner_id() {
    let server = FakeServer::new();
    server.seed("/posts", json!({"id": 5, "title": "a", "author_id": null}));
    server.seed("/comments", json!({"id": 1, "body": "x", "post_id": 5}));
    server.seed("/comments", json!({"id": 2, "body": "y", "post_id": 5}));
    server.seed("/comments", json!({"id": 3, "body": "z", "post_id": 6}));
    let manager = manager(&server);

    let post = manager.find("Post", 5).unwrap().unwrap();
    let comments = post.related_many("comments").unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(post.related_many("comments").unwrap().len(), 2);
    assert_eq!(server.log(), vec!["GET /posts/5", "GET /comments?post_id=5"]);
}

#[test]
fn test_has_one_filters_by_owner_id() {
    let server = FakeServer::new();
    server.seed("/users", json!({"id": 1, "name": "ann"}));
    server.seed("/profiles", json!({"id": 4, "user_id": 1, "bio": "hello"}));
    let manager = manager(&server);

    let user = manager.find("User", 1).unwrap().unwrap();
    let profile = user.related("profile").unwrap().unwrap();
    assert_eq!(profile.get("bio"), Value::Text("hello".into()));
    assert_eq!(server.log(), vec!["GET /users/1", "GET /profiles?user_id=1"]);
}

#[test]
fn test_missing_keys_defer_the_fetch() {
    let server = FakeServer::new();
    server.seed("/comments", json!({"id": 1, "body": "x", "post_id": 5}));
    let manager = manager(&server);

    let post = manager.create("Post").unwrap();
    assert!(post.related("author").unwrap().is_none());
    assert!(post.related_many("comments").unwrap().is_empty());
    assert!(server.log().is_empty());

    post.set("id", 5);
    assert_eq!(post.related_many("comments").unwrap().len(), 1);
    assert_eq!(server.log(), vec!["GET /comments?post_id=5"]);
}

#[test]
fn test_iri_collection_resolves_each_reference() {
    let server = FakeServer::new();
    server.seed("/tags", json!({"id": 10, "name": "rust"}));
    server.seed("/tags", json!({"id": 11, "name": "orm"}));
    server.seed("/articles", json!({"id": 1, "tags": ["/tags/10", "/tags/11"]}));
    let manager = manager(&server);

    let article = manager.find("Article", 1).unwrap().unwrap();
    let tags = article.related_many("tag_list").unwrap();

    let names: Vec<Value> = tags.iter().map(|tag| tag.get("name")).collect();
    assert_eq!(names, vec![Value::from("rust"), Value::from("orm")]);
    assert_eq!(
        server.log(),
        vec!["GET /articles/1", "GET /tags/10", "GET /tags/11"]
    );
}

#[test]
fn test_composite_belongs_to_uses_filtered_lookup() {
    let server = FakeServer::new();
    server.seed("/cells", json!({"x": 1, "y": 2, "name": "a1"}));
    server.seed("/sheets", json!({"id": 3, "x": 1, "y": 2}));
    let manager = manager(&server);

    let sheet = manager.find("Sheet", 3).unwrap().unwrap();
    let cell = sheet.related("cell").unwrap().unwrap();
    assert_eq!(cell.get("name"), Value::Text("a1".into()));
    assert_eq!(server.log(), vec!["GET /sheets/3", "GET /cells?x=1&y=2"]);
}

#[test]
fn test_text_foreign_key_is_read_as_iri() {
    let server = FakeServer::new();
    server.seed("/posts", json!({"id": 5, "title": "a", "author_id": null}));
    server.seed("/reviews", json!({"id": 1, "post": "/posts/5"}));
    let manager = manager(&server);

    let review = manager.find("Review", 1).unwrap().unwrap();
    let post = review.related("reviewed").unwrap().unwrap();
    assert_eq!(post.get("id"), Value::Integer(5));
    assert_eq!(server.log(), vec!["GET /reviews/1", "GET /posts/5"]);
}

#[test]
fn test_assigned_relation_is_never_fetched() {
    let server = FakeServer::new();
    server.seed("/posts", json!({"id": 5, "title": "a", "author_id": 1}));
    let manager = manager(&server);

    let post = manager.find("Post", 5).unwrap().unwrap();
    let author = TransferRef::new(Transfer::new("User").with("id", 2));
    post.set_related("author", Some(author.clone()));

    assert!(post.related("author").unwrap().unwrap().ptr_eq(&author));
    assert_eq!(server.log().len(), 1);
}

#[test]
fn test_proxy_keeps_existing_relations() {
    let server = FakeServer::new();
    let manager = manager(&server);

    let comment = TransferRef::new(Transfer::new("Comment").with("id", 1));
    let post = TransferRef::new(Transfer::new("Post").with("id", 5).with_many("comments", vec![comment.clone()]));
    let proxy = ProxyFactory::create_proxy(post.clone(), &manager).unwrap();

    assert!(proxy.ptr_eq(&post));
    assert!(proxy.is_proxy());
    assert!(proxy.related_many("comments").unwrap()[0].ptr_eq(&comment));
    assert!(server.log().is_empty());
}

#[test]
fn test_dropped_manager_fails_loading() {
    let server = FakeServer::new();
    server.seed("/posts", json!({"id": 5, "title": "a", "author_id": 1}));

    let post = {
        let manager = manager(&server);
        let post = manager.find("Post", 5).unwrap().unwrap();
        manager.clear();
        post
    };

    assert!(matches!(
        post.related("author"),
        Err(MapperError::ManagerUnavailable)
    ));
}
