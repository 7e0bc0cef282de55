#![cfg(feature = "memory-store")]

use org_acl::{
    AclConfig, AclRegistry, Client, Container, EditAction, Error, ErrorClass, GateScope, Group,
    MemoryDirectory, OrgName, Resource, User,
};
use serde_json::json;
use tempfile::TempDir;

struct Setup {
    _dir: TempDir,
    org: OrgName,
    registry: AclRegistry<MemoryDirectory>,
}

fn setup() -> Setup {
    let dir = TempDir::new().unwrap();
    let org = OrgName::try_from("acme").unwrap();
    let directory = MemoryDirectory::new();
    for name in ["alice", "bob", "carol"] {
        directory.add_user(User::new(name));
    }
    directory.associate(&org, "alice");
    directory.associate(&org, "bob");
    directory.add_client(Client::new("builder", org.clone()));
    directory.add_group(&org, Group::new("admins"));
    directory.add_group(&org, Group::new("users").with_actor("alice").with_actor("bob"));
    directory.add_group(&org, Group::new("ops").with_actor("carol"));
    directory.add_container(&org, Container::new("nodes"));

    let config = AclConfig::new(dir.path()).gate_scope(GateScope::Organization);
    let registry = AclRegistry::new(config, directory);
    Setup {
        _dir: dir,
        org,
        registry,
    }
}

#[tokio::test]
async fn new_item_lifecycle_should_keep_grants_consistent() {
    let setup = setup();
    let checker = setup.registry.load_acl(&setup.org).await.unwrap();
    let alice = User::new("alice");
    let bob = User::new("bob");
    let web1 = Resource::new("nodes", "web1");

    checker.creator_only(&web1, &alice).await.unwrap();
    assert!(checker.check_item_perm(&web1, &alice, "grant").await.unwrap());
    assert!(!checker.check_item_perm(&web1, &bob, "read").await.unwrap());

    let payload = json!({"read": {"actors": ["alice", "bob"], "groups": []}});
    checker.edit_from_json_value(&web1, "read", &payload).await.unwrap();
    assert!(checker.check_item_perm(&web1, &bob, "read").await.unwrap());

    let renamed = Resource::new("nodes", "web2");
    checker.rename_item_acl(&renamed, "web1").await.unwrap();
    assert!(checker.check_item_perm(&renamed, &bob, "read").await.unwrap());
    assert!(!checker.check_item_perm(&web1, &bob, "read").await.unwrap());

    assert!(checker.delete_item_acl(&renamed).await.unwrap());
    assert!(!checker.check_item_perm(&renamed, &alice, "grant").await.unwrap());
}

#[tokio::test]
async fn group_membership_should_drive_general_rules() {
    let setup = setup();
    let checker = setup.registry.load_acl(&setup.org).await.unwrap();
    let users = Group::new("users").with_actor("alice").with_actor("bob");
    let bob = User::new("bob");
    let node = Resource::new("nodes", "db1");

    assert!(!checker.check_item_perm(&node, &bob, "update").await.unwrap());
    checker.add_acl_role(&users).await.unwrap();
    assert!(checker.check_item_perm(&node, &bob, "update").await.unwrap());

    checker.remove_user(&bob).await.unwrap();
    assert!(!checker.check_item_perm(&node, &bob, "update").await.unwrap());
}

#[tokio::test]
async fn errors_should_classify_for_callers() {
    let setup = setup();
    let checker = setup.registry.load_acl(&setup.org).await.unwrap();
    let node = Resource::new("nodes", "db1");

    let err = checker.check_item_perm(&node, &User::new("carol"), "read").await.unwrap_err();
    assert!(matches!(err, Error::NotAssociated { .. }));
    assert_eq!(err.class(), ErrorClass::Forbidden);

    let err = checker
        .check_item_perm(&node, &User::new("alice"), "launch")
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadRequest);

    let err = checker
        .edit_item_perm(&node, &User::new("alice"), &["launch"], EditAction::Add)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::BadRequest);

    let err = checker.get_item_acl(&Resource::new("widgets", "w1")).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[tokio::test]
async fn clients_should_use_owning_org_and_container_checks() {
    let setup = setup();
    let checker = setup.registry.load_acl(&setup.org).await.unwrap();
    let builder = Client::new("builder", setup.org.clone());
    let node = Resource::new("nodes", "db1");

    checker.edit_item_perm(&node, &builder, &["update"], EditAction::Add).await.unwrap();
    assert!(checker.check_item_perm(&node, &builder, "update").await.unwrap());
    assert!(!checker.check_container_perm(&builder, "nodes", "create").await.unwrap());

    let err = checker.check_container_perm(&builder, "widgets", "read").await.unwrap_err();
    assert!(matches!(err, Error::UnknownContainer(_)));
}

#[tokio::test]
async fn acl_snapshot_should_serialize_for_api_responses() {
    let setup = setup();
    let checker = setup.registry.load_acl(&setup.org).await.unwrap();
    let admins = Group::new("admins");

    let request = json!({"read": {"actors": ["alice"], "groups": ["ops"]}});
    checker.edit_from_json_value(&admins, "read", &request).await.unwrap();

    let acl = checker.get_item_acl(&admins).await.unwrap();
    let value = serde_json::to_value(&acl).unwrap();
    assert_eq!(
        value["read"],
        json!({"actors": ["alice", "pivotal"], "groups": ["ops"]})
    );
}
