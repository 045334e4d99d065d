//! Shared metadata fixtures for unit tests.

use std::sync::Arc;

use crate::core::FieldType;
use crate::metadata::{MetadataProvider, MetadataRegistry, Resource, TransferMetadata};

pub(crate) fn blog_registry() -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    let declarations = [
        TransferMetadata::builder("User", Resource::new("blog", "/users"))
            .id("id", FieldType::Integer)
            .field("name", FieldType::Text)
            .has_one("profile", "Profile", "user_id"),
        TransferMetadata::builder("Profile", Resource::new("blog", "/profiles"))
            .id("id", FieldType::Integer)
            .field("user_id", FieldType::Integer)
            .field("bio", FieldType::Text),
        TransferMetadata::builder("Post", Resource::new("blog", "/posts"))
            .id("id", FieldType::Integer)
            .field("title", FieldType::Text)
            .field("author_id", FieldType::Integer)
            .belongs_to("author", "User", "author_id")
            .has_many("comments", "Comment", "post_id"),
        TransferMetadata::builder("Comment", Resource::new("blog", "/comments"))
            .id("id", FieldType::Integer)
            .field("body", FieldType::Text)
            .field("post_id", FieldType::Integer),
        TransferMetadata::builder("Cell", Resource::new("blog", "/cells"))
            .id("x", FieldType::Integer)
            .id("y", FieldType::Integer)
            .field("name", FieldType::Text),
        TransferMetadata::builder("Sheet", Resource::new("blog", "/sheets"))
            .id("id", FieldType::Integer)
            .field("x", FieldType::Integer)
            .field("y", FieldType::Integer)
            .belongs_to_composite("cell", "Cell", &["x", "y"]),
        TransferMetadata::builder("Tag", Resource::new("blog", "/tags"))
            .id("id", FieldType::Integer)
            .field("name", FieldType::Text),
        TransferMetadata::builder("Article", Resource::new("blog", "/articles"))
            .id("id", FieldType::Integer)
            .field("tags", FieldType::List)
            .has_many_iri("tag_list", "Tag", "tags"),
    ];

    for builder in declarations {
        registry
            .register(builder.build().expect("fixture metadata is valid"))
            .expect("fixture metadata registers");
    }
    registry.validate().expect("fixture metadata is consistent");
    registry
}

pub(crate) fn blog_metadata() -> Arc<dyn MetadataProvider> {
    Arc::new(blog_registry())
}
