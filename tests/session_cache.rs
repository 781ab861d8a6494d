mod support;

use stealth_browse::browser::{ControlChannel, Modifiers, PageId, SessionCache};
use stealth_browse::input::{BackendKind, InputBackend, ProtocolBackend};
use stealth_browse::tools::click_through;
use support::{FakeChannel, FakePage, ScriptedBackend, World};

fn journal(world: &std::rc::Rc<std::cell::RefCell<World>>) -> Vec<String> {
    world.borrow().journal.iter().filter(|e| !e.starts_with("tab:")).cloned().collect()
}

#[test]
fn test_same_page_reuses_channel() {
    let world = World::shared();
    let page = FakePage::new(&world, "https://a.test/");
    let mut cache: SessionCache<FakeChannel> = SessionCache::new();

    cache.acquire(&page).unwrap().send("Input.dispatchMouseEvent", serde_json::json!({})).unwrap();
    cache.acquire(&page).unwrap().send("Input.dispatchMouseEvent", serde_json::json!({})).unwrap();

    let opens = journal(&world).iter().filter(|e| e.starts_with("open:")).count();
    assert_eq!(opens, 1);
    assert_eq!(cache.bound_page(), Some(&PageId(page.id.clone())));
}

#[test]
fn test_rebinding_detaches_old_channel_before_opening_new() {
    let world = World::shared();
    let first = FakePage::new(&world, "https://a.test/");
    let second = FakePage::new(&world, "https://b.test/");
    let mut cache: SessionCache<FakeChannel> = SessionCache::new();

    cache.acquire(&first).unwrap();
    cache.acquire(&second).unwrap();

    assert_eq!(
        journal(&world),
        vec![
            format!("open:{}", first.id),
            format!("detach:{}", first.id),
            format!("open:{}", second.id),
        ]
    );
    assert_eq!(cache.bound_page(), Some(&PageId(second.id.clone())));
}

#[test]
fn test_detach_failure_is_swallowed() {
    let world = World::shared();
    let first = FakePage::new(&world, "https://a.test/");
    let second = FakePage::new(&world, "https://b.test/");
    first.state.borrow_mut().detach_fails = true;
    let mut cache: SessionCache<FakeChannel> = SessionCache::new();

    cache.acquire(&first).unwrap();
    assert!(cache.acquire(&second).is_ok());
    assert_eq!(cache.bound_page(), Some(&PageId(second.id.clone())));
}

#[test]
fn test_release_and_drop_detach_once() {
    let world = World::shared();
    let page = FakePage::new(&world, "https://a.test/");

    let mut cache: SessionCache<FakeChannel> = SessionCache::new();
    cache.acquire(&page).unwrap();
    cache.release();
    cache.release();
    assert!(cache.bound_page().is_none());
    drop(cache);

    let detaches = journal(&world).iter().filter(|e| e.starts_with("detach:")).count();
    assert_eq!(detaches, 1);

    {
        let mut cache: SessionCache<FakeChannel> = SessionCache::new();
        cache.acquire(&page).unwrap();
    }
    let detaches = journal(&world).iter().filter(|e| e.starts_with("detach:")).count();
    assert_eq!(detaches, 2);
}

#[test]
fn test_protocol_backend_follows_the_page_it_drives() {
    let world = World::shared();
    let first = FakePage::new(&world, "https://a.test/");
    let second = FakePage::new(&world, "https://b.test/");
    let mut protocol: ProtocolBackend<FakeChannel> = ProtocolBackend::new(stealth_browse::input::Pacing::Instant);

    protocol.click_at(&first, 10.0, 10.0, Modifiers::NONE).unwrap();
    protocol.click_at(&first, 20.0, 20.0, Modifiers::NONE).unwrap();
    protocol.press_key(&second, "Enter").unwrap();

    let events = journal(&world);
    let opens: Vec<_> = events.iter().filter(|e| e.starts_with("open:")).cloned().collect();
    assert_eq!(opens, vec![format!("open:{}", first.id), format!("open:{}", second.id)]);

    let detach_at = events.iter().position(|e| *e == format!("detach:{}", first.id)).unwrap();
    let second_open_at = events.iter().position(|e| *e == format!("open:{}", second.id)).unwrap();
    assert!(detach_at < second_open_at);
    assert!(events.iter().skip(second_open_at).all(|e| !e.contains(&first.id)));
    assert_eq!(protocol.session().bound_page(), Some(&PageId(second.id.clone())));

    protocol.release();
    assert!(protocol.session().bound_page().is_none());
}

#[test]
fn test_channel_failure_escalates_to_next_backend() {
    let world = World::shared();
    let page = FakePage::new(&world, "https://a.test/");
    page.state.borrow_mut().channel_fails = true;

    let mut protocol: ProtocolBackend<FakeChannel> = ProtocolBackend::new(stealth_browse::input::Pacing::Instant);
    let mut os = ScriptedBackend::working(BackendKind::Os);

    let outcome = {
        let mut chain: Vec<&mut dyn InputBackend<FakePage>> = vec![&mut protocol, &mut os];
        click_through(&mut chain, &page, 50.0, 60.0, Modifiers::NONE, "submit")
    };

    assert_eq!(outcome.via(), Some(BackendKind::Os));
    assert_eq!(outcome.failures()[0].backend, BackendKind::Protocol);
    assert_eq!(os.clicks(), 1);
}
