use lockbox_core::{Error, KdbxProvider, Manager, Passphrase, PersistenceProvider, Workspace};
use tempfile::tempdir;

fn sample() -> Workspace {
    let mut ws = Workspace::new("Personal");
    let finance = ws.create_group(None, "Finance").unwrap();
    let cards = ws.create_group(Some(finance), "Cards").unwrap();
    let bank = ws.create_entry(finance, "Bank").unwrap();
    let entry = ws.entry_mut(bank).unwrap();
    entry.set_property("username", "alice");
    entry.set_property("password", "s3cret");
    entry.set_meta("url", "bank.example");
    ws.create_entry(cards, "Visa").unwrap();
    ws.create_group(None, "Email").unwrap();
    ws
}

#[tokio::test]
async fn provider_round_trips_workspace() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("vault.kdbx");
    let passphrase = Passphrase::new("correct horse");
    let original = sample();

    KdbxProvider
        .save(&path, &passphrase, &original)
        .await
        .expect("save");
    let loaded = KdbxProvider.load(&path, &passphrase).await.expect("load");

    assert_eq!(loaded.name(), "Personal");
    assert_eq!(loaded.group_count(), original.group_count());
    assert_eq!(loaded.entry_count(), original.entry_count());
    let titles: Vec<_> = loaded.root_groups().map(|g| g.title().to_string()).collect();
    assert_eq!(titles, ["Finance", "Email"]);

    for group in original.walk() {
        let twin = loaded.group(group.id()).expect("group survives");
        assert_eq!(twin.title(), group.title());
        for entry in original.entries_of(group.id()) {
            let twin = loaded.entry(entry.id()).expect("entry survives");
            assert_eq!(twin.properties(), entry.properties());
            assert_eq!(twin.meta_map(), entry.meta_map());
        }
    }
}

#[tokio::test]
async fn manager_create_edit_save_reopen() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("new.kdbx");

    let mut manager = Manager::new(KdbxProvider);
    manager
        .create(&path, Passphrase::new("pw"))
        .await
        .expect("create");
    assert!(path.exists());

    let g = manager.create_group("Finance").unwrap();
    let e = manager.workspace_mut().unwrap().create_entry(g, "Bank").unwrap();
    manager.save().await.expect("save");

    let mut reopened = Manager::new(KdbxProvider);
    reopened.open(&path, Passphrase::new("pw")).await.expect("open");
    assert_eq!(reopened.find_group(&g.to_string()).unwrap().unwrap().title(), "Finance");
    assert_eq!(reopened.find_entry(&e.to_string()).unwrap().unwrap().title(), "Bank");
    assert_eq!(
        reopened.workspace().unwrap().origin().unwrap().location,
        path
    );
}

#[tokio::test]
async fn failed_open_keeps_previous_workspace() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("locked.kdbx");
    KdbxProvider
        .save(&path, &Passphrase::new("right"), &sample())
        .await
        .expect("save");

    let mut manager = Manager::new(KdbxProvider);
    manager.set_workspace(Workspace::new("current"));

    let err = manager
        .open(&path, Passphrase::new("wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Persistence { action: "open", .. }));
    assert_eq!(err.kind(), "persistence");
    assert_eq!(manager.workspace().unwrap().name(), "current");

    let missing = manager
        .open(temp.path().join("missing.kdbx"), Passphrase::new("right"))
        .await
        .unwrap_err();
    assert!(missing.to_string().contains("missing.kdbx"));
    assert_eq!(manager.workspace().unwrap().name(), "current");
}
