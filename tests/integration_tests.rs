//! End-to-end tests for the workspace/folder/note lifecycle.
//!
//! Runs against an in-memory SQLite database through `AppState`, exercising
//! creation, sharing, editing, archiving, deletion guards and the
//! notifications produced along the way.

use notecolab::models::{
    FolderCreate, NoteCreate, NoteReference, NoteUpdate, Permission, User, WorkspaceCreate,
    WorkspaceUpdate,
};
use notecolab::{AppState, Error};

async fn setup() -> AppState {
    AppState::in_memory().await.expect("failed to create state")
}

async fn register(state: &AppState, name: &str, email: &str) -> User {
    state
        .users
        .register(name, email)
        .await
        .expect("failed to register user")
}

fn workspace_named(name: &str) -> WorkspaceCreate {
    WorkspaceCreate {
        name: name.to_string(),
        ..Default::default()
    }
}

fn note_in(workspace_id: &str, title: &str) -> NoteCreate {
    NoteCreate {
        title: title.to_string(),
        content: "initial content".to_string(),
        workspace_id: workspace_id.to_string(),
        ..Default::default()
    }
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_register_normalizes_email_and_rejects_duplicates() {
    let state = setup().await;

    let alice = register(&state, "Alice", "  Alice@Example.COM ").await;
    assert_eq!(alice.email, "alice@example.com");
    assert!(alice.is_active);

    let err = state
        .users
        .register("Other", "alice@example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)), "got {err:?}");
}

#[tokio::test]
async fn test_register_validates_input() {
    let state = setup().await;

    let err = state.users.register("  ", "a@b.c").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = state.users.register("Bob", "not-an-email").await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_user_search_excludes_caller_and_inactive() {
    let state = setup().await;

    let alice = register(&state, "Alice", "alice@example.com").await;
    let bob = register(&state, "Bob Marley", "bob@example.com").await;
    let carol = register(&state, "Bobby", "carol@example.com").await;

    state.users.deactivate(&carol).await.unwrap();

    let hits = state.users.search("bob", &alice, 10).await.unwrap();
    let ids: Vec<&str> = hits.iter().map(|u| u.id.as_str()).collect();
    assert!(ids.contains(&bob.id.as_str()));
    assert!(!ids.contains(&carol.id.as_str()), "inactive user returned");
    assert!(!ids.contains(&alice.id.as_str()), "caller returned");
}

// ============================================================================
// Workspaces
// ============================================================================

#[tokio::test]
async fn test_workspace_create_update_delete() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Projects"))
        .await
        .unwrap();
    assert_eq!(ws.name, "Projects");
    assert_eq!(ws.owner_id, alice.id);
    assert!(!ws.is_public);
    assert_eq!(ws.color, "#6366f1");

    let updated = state
        .workspaces
        .update(
            &ws.id,
            &alice,
            WorkspaceUpdate {
                name: Some("Projects 2026".to_string()),
                is_public: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Projects 2026");
    assert!(updated.is_public);

    state.workspaces.delete(&ws.id, &alice).await.unwrap();

    let err = state.workspaces.get(&ws.id, &alice).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_workspace_create_requires_nonempty_name() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let err = state
        .workspaces
        .create(&alice, workspace_named("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_workspace_nesting_requires_write_on_parent() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;
    let bob = register(&state, "Bob", "bob@example.com").await;

    let parent = state
        .workspaces
        .create(&alice, workspace_named("Parent"))
        .await
        .unwrap();

    let err = state
        .workspaces
        .create(
            &bob,
            WorkspaceCreate {
                name: "Child".to_string(),
                parent_id: Some(parent.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let child = state
        .workspaces
        .create(
            &alice,
            WorkspaceCreate {
                name: "Child".to_string(),
                parent_id: Some(parent.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let children = state.workspaces.children(&parent.id, &alice).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);

    let roots = state.workspaces.hierarchy(&alice).await.unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, parent.id);
}

#[tokio::test]
async fn test_workspace_delete_blocked_by_children() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let parent = state
        .workspaces
        .create(&alice, workspace_named("Parent"))
        .await
        .unwrap();
    let child = state
        .workspaces
        .create(
            &alice,
            WorkspaceCreate {
                name: "Child".to_string(),
                parent_id: Some(parent.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = state.workspaces.delete(&parent.id, &alice).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)), "got {err:?}");

    state.workspaces.delete(&child.id, &alice).await.unwrap();
    state.workspaces.delete(&parent.id, &alice).await.unwrap();
}

#[tokio::test]
async fn test_workspace_delete_blocked_by_notes() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    let note = state
        .notes
        .create(&alice, note_in(&ws.id, "Draft"))
        .await
        .unwrap();

    let err = state.workspaces.delete(&ws.id, &alice).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    state.notes.delete(&note.id, &alice).await.unwrap();
    state.workspaces.delete(&ws.id, &alice).await.unwrap();
}

// ============================================================================
// Folders
// ============================================================================

#[tokio::test]
async fn test_folder_lifecycle_and_workspace_agreement() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws_a = state
        .workspaces
        .create(&alice, workspace_named("A"))
        .await
        .unwrap();
    let ws_b = state
        .workspaces
        .create(&alice, workspace_named("B"))
        .await
        .unwrap();

    let root = state
        .folders
        .create(
            &alice,
            FolderCreate {
                name: "Root".to_string(),
                workspace_id: ws_a.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Nesting under a folder from another workspace is rejected.
    let err = state
        .folders
        .create(
            &alice,
            FolderCreate {
                name: "Stray".to_string(),
                workspace_id: ws_b.id.clone(),
                parent_id: Some(root.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)), "got {err:?}");

    let child = state
        .folders
        .create(
            &alice,
            FolderCreate {
                name: "Child".to_string(),
                workspace_id: ws_a.id.clone(),
                parent_id: Some(root.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let listed = state.folders.list_by_workspace(&ws_a.id, &alice).await.unwrap();
    assert_eq!(listed.len(), 2);

    let roots = state.folders.hierarchy(&ws_a.id, &alice).await.unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, root.id);

    let children = state.folders.children(&root.id, &alice).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);
}

#[tokio::test]
async fn test_folder_delete_blocked_until_empty() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("A"))
        .await
        .unwrap();
    let folder = state
        .folders
        .create(
            &alice,
            FolderCreate {
                name: "Inbox".to_string(),
                workspace_id: ws.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let note = state
        .notes
        .create(
            &alice,
            NoteCreate {
                folder_id: Some(folder.id.clone()),
                ..note_in(&ws.id, "In folder")
            },
        )
        .await
        .unwrap();

    let err = state.folders.delete(&folder.id, &alice).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    state.notes.delete(&note.id, &alice).await.unwrap();
    state.folders.delete(&folder.id, &alice).await.unwrap();
}

#[tokio::test]
async fn test_profile_and_language_updates() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let updated = state
        .users
        .update_profile(&alice, Some("Alice B."), Some("https://cdn/avatar.png"))
        .await
        .unwrap();
    assert_eq!(updated.name, "Alice B.");
    assert_eq!(updated.avatar_url.as_deref(), Some("https://cdn/avatar.png"));

    let updated = state.users.update_language(&alice, "fr").await.unwrap();
    assert_eq!(updated.language, "fr");

    assert!(alice.last_login.is_none());
    state.users.record_login(&alice).await.unwrap();
    let reloaded = state.users.get(&alice.id).await.unwrap();
    assert!(reloaded.last_login.is_some());
}

// ============================================================================
// Notes
// ============================================================================

#[tokio::test]
async fn test_note_create_defaults_and_validation() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();

    let note = state
        .notes
        .create(&alice, note_in(&ws.id, "Plan"))
        .await
        .unwrap();
    assert_eq!(note.version, 1);
    assert!(!note.is_archived);
    assert_eq!(note.author_id, alice.id);

    let err = state
        .notes
        .create(&alice, note_in(&ws.id, "   "))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let err = state
        .notes
        .create(&alice, note_in("missing-ws", "Plan"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_note_create_rejects_folder_from_other_workspace() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws_a = state
        .workspaces
        .create(&alice, workspace_named("A"))
        .await
        .unwrap();
    let ws_b = state
        .workspaces
        .create(&alice, workspace_named("B"))
        .await
        .unwrap();
    let folder_b = state
        .folders
        .create(
            &alice,
            FolderCreate {
                name: "In B".to_string(),
                workspace_id: ws_b.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = state
        .notes
        .create(
            &alice,
            NoteCreate {
                folder_id: Some(folder_b.id.clone()),
                ..note_in(&ws_a.id, "Misfiled")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)), "got {err:?}");
}

#[tokio::test]
async fn test_note_version_increments_on_every_update() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    let note = state
        .notes
        .create(&alice, note_in(&ws.id, "Plan"))
        .await
        .unwrap();

    let v2 = state
        .notes
        .update(
            &note.id,
            &alice,
            NoteUpdate {
                content: Some("second draft".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(v2.version, 2);

    // An update that changes nothing still counts as an edit attempt.
    let v3 = state
        .notes
        .update(&note.id, &alice, NoteUpdate::default())
        .await
        .unwrap();
    assert_eq!(v3.version, 3);

    let stored = state.notes.get(&note.id, &alice).await.unwrap();
    assert_eq!(stored.version, 3);
    assert_eq!(stored.content, "second draft");
}

#[tokio::test]
async fn test_note_archive_toggle_preserves_version() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    let note = state
        .notes
        .create(&alice, note_in(&ws.id, "Plan"))
        .await
        .unwrap();

    let archived = state.notes.toggle_archive(&note.id, &alice).await.unwrap();
    assert!(archived.is_archived);
    assert_eq!(archived.version, 1);

    let restored = state.notes.toggle_archive(&note.id, &alice).await.unwrap();
    assert!(!restored.is_archived);
    assert_eq!(restored.version, 1);
}

#[tokio::test]
async fn test_note_references_resolve_and_reject_self() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    let a = state.notes.create(&alice, note_in(&ws.id, "A")).await.unwrap();
    let b = state.notes.create(&alice, note_in(&ws.id, "B")).await.unwrap();

    let err = state
        .notes
        .update(
            &a.id,
            &alice,
            NoteUpdate {
                references: Some(vec![NoteReference {
                    note_id: a.id.clone(),
                    start: 0,
                    end: 4,
                }]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOperation(_)));

    state
        .notes
        .update(
            &a.id,
            &alice,
            NoteUpdate {
                references: Some(vec![NoteReference {
                    note_id: b.id.clone(),
                    start: 0,
                    end: 4,
                }]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let linked = state.notes.linked_notes(&a.id, &alice).await.unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].id, b.id);
}

#[tokio::test]
async fn test_note_listing_pagination_and_archived_filter() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();

    for i in 0..5 {
        state
            .notes
            .create(&alice, note_in(&ws.id, &format!("Note {i}")))
            .await
            .unwrap();
    }
    let archived = state
        .notes
        .create(&alice, note_in(&ws.id, "Old"))
        .await
        .unwrap();
    state.notes.toggle_archive(&archived.id, &alice).await.unwrap();

    let page = state
        .notes
        .list_accessible(&alice, 1, 2, Some(false))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);

    let last = state
        .notes
        .list_accessible(&alice, 3, 2, Some(false))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);

    let archived_only = state
        .notes
        .list_accessible(&alice, 1, 10, Some(true))
        .await
        .unwrap();
    assert_eq!(archived_only.total, 1);
    assert_eq!(archived_only.items[0].id, archived.id);

    let all = state.notes.list_accessible(&alice, 1, 10, None).await.unwrap();
    assert_eq!(all.total, 6);
}

#[tokio::test]
async fn test_note_children_and_workspace_search() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Research notes"))
        .await
        .unwrap();
    let parent = state
        .notes
        .create(&alice, note_in(&ws.id, "Outline"))
        .await
        .unwrap();
    let child = state
        .notes
        .create(
            &alice,
            NoteCreate {
                parent_id: Some(parent.id.clone()),
                ..note_in(&ws.id, "Chapter 1")
            },
        )
        .await
        .unwrap();

    let children = state.notes.children(&parent.id, &alice).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, child.id);

    let err = state
        .notes
        .create(
            &alice,
            NoteCreate {
                parent_id: Some("missing".to_string()),
                ..note_in(&ws.id, "Orphan")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let hits = state.workspaces.search(&alice, "research").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ws.id);
}

#[tokio::test]
async fn test_note_search_skips_archived() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    state
        .notes
        .create(&alice, note_in(&ws.id, "Meeting notes"))
        .await
        .unwrap();
    let old = state
        .notes
        .create(&alice, note_in(&ws.id, "Old meeting"))
        .await
        .unwrap();
    state.notes.toggle_archive(&old.id, &alice).await.unwrap();

    let hits = state.notes.search(&alice, "MEETING").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Meeting notes");
}

#[tokio::test]
async fn test_folder_note_listing_and_search() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    let folder = state
        .folders
        .create(
            &alice,
            FolderCreate {
                name: "Inbox".to_string(),
                workspace_id: ws.id.clone(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    for title in ["Groceries", "Grocery budget", "Reading list"] {
        state
            .notes
            .create(
                &alice,
                NoteCreate {
                    folder_id: Some(folder.id.clone()),
                    ..note_in(&ws.id, title)
                },
            )
            .await
            .unwrap();
    }
    // A note outside the folder stays out of folder listings.
    state
        .notes
        .create(&alice, note_in(&ws.id, "Loose note"))
        .await
        .unwrap();

    let all = state.notes.list_by_folder(&folder.id, &alice).await.unwrap();
    assert_eq!(all.len(), 3);

    let filtered = state
        .folders
        .notes(&folder.id, &alice, Some("grocer"))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 2);

    let unfiltered = state.folders.notes(&folder.id, &alice, None).await.unwrap();
    assert_eq!(unfiltered.len(), 3);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn test_share_creates_invitation_notification() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;
    let bob = register(&state, "Bob", "bob@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Shared"))
        .await
        .unwrap();
    state
        .workspaces
        .add_collaborator(&ws.id, &alice, "bob@example.com", Permission::Write)
        .await
        .unwrap();

    let page = state.notifications.list(&bob, 1, 10, false).await.unwrap();
    assert_eq!(page.total, 1);
    let n = &page.items[0];
    assert_eq!(n.kind, "share_invitation");
    assert!(n.message.contains("Alice"));
    assert!(n.message.contains("Shared"));
    assert!(!n.is_read);

    assert_eq!(state.notifications.unread_count(&bob).await.unwrap(), 1);

    state
        .notifications
        .mark_as_read(&bob, &[n.id.clone()])
        .await
        .unwrap();
    assert_eq!(state.notifications.unread_count(&bob).await.unwrap(), 0);
}

#[tokio::test]
async fn test_edit_notifies_other_participants_only() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;
    let bob = register(&state, "Bob", "bob@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    let note = state
        .notes
        .create(&alice, note_in(&ws.id, "Plan"))
        .await
        .unwrap();
    state
        .notes
        .add_collaborator(&note.id, &alice, "bob@example.com", Permission::Write)
        .await
        .unwrap();

    // Bob edits; Alice is notified, Bob is not.
    state
        .notes
        .update(
            &note.id,
            &bob,
            NoteUpdate {
                content: Some("bob's edit".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let alice_page = state.notifications.list(&alice, 1, 10, false).await.unwrap();
    assert_eq!(alice_page.total, 1);
    assert_eq!(alice_page.items[0].kind, "content_modified");

    let bob_page = state.notifications.list(&bob, 1, 10, true).await.unwrap();
    // Bob still has the share invitation but no modification notice.
    assert!(bob_page.items.iter().all(|n| n.kind != "content_modified"));
}

#[tokio::test]
async fn test_note_delete_removes_its_notifications() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;
    let bob = register(&state, "Bob", "bob@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    let note = state
        .notes
        .create(&alice, note_in(&ws.id, "Plan"))
        .await
        .unwrap();
    state
        .notes
        .add_collaborator(&note.id, &alice, "bob@example.com", Permission::Write)
        .await
        .unwrap();
    state
        .notes
        .update(
            &note.id,
            &bob,
            NoteUpdate {
                content: Some("edit".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(state.notifications.unread_count(&alice).await.unwrap(), 1);

    state.notes.delete(&note.id, &alice).await.unwrap();

    // The modification notice referenced the note and is gone with it.
    assert_eq!(state.notifications.unread_count(&alice).await.unwrap(), 0);
}

#[tokio::test]
async fn test_mark_all_as_read() {
    let state = setup().await;
    let alice = register(&state, "Alice", "alice@example.com").await;
    let bob = register(&state, "Bob", "bob@example.com").await;

    let ws = state
        .workspaces
        .create(&alice, workspace_named("Docs"))
        .await
        .unwrap();
    for _ in 0..3 {
        state
            .workspaces
            .add_collaborator(&ws.id, &alice, "bob@example.com", Permission::Read)
            .await
            .unwrap();
    }

    assert_eq!(state.notifications.unread_count(&bob).await.unwrap(), 3);
    let changed = state.notifications.mark_all_as_read(&bob).await.unwrap();
    assert_eq!(changed, 3);
    assert_eq!(state.notifications.unread_count(&bob).await.unwrap(), 0);
}
