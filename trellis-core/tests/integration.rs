//! Integration Tests for the Rendering Engine
//!
//! These tests mount trees into an in-memory host through a root and a
//! manually flushed scheduler, and check the host tree, the recorded host
//! mutations and the commit summaries.

use std::sync::Arc;

use parking_lot::Mutex;

use trellis_core::deps;
use trellis_core::host::HostOp;
use trellis_core::{
    create_root, Children, ClassComponent, Component, Config, Element, Event, FunctionComponent,
    HookError, HostHandle, Listener, ManualMacrotask, MemoryHost, Props, RenderError, RenderResult,
    Root, RootConfig, Scheduler, SetState, TokioMacrotask,
};

struct Fixture {
    host: MemoryHost,
    container: HostHandle,
    scheduler: Scheduler,
    boundary: ManualMacrotask,
    root: Root,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(RootConfig::default())
    }

    fn with_config(config: RootConfig) -> Self {
        let host = MemoryHost::new();
        let container = host.create_container("div");
        let (scheduler, boundary) = Scheduler::manual();
        let root = Root::with_config(host.clone(), container, &scheduler, config);
        Self {
            host,
            container,
            scheduler,
            boundary,
            root,
        }
    }

    /// Render and flush.
    fn show(&self, children: impl Into<Children>) {
        self.root.render(children);
        self.scheduler.flush_work();
    }

    fn markup(&self) -> String {
        self.host.inner_markup(self.container).unwrap()
    }

    /// Handles of the children of the container's first child.
    fn list_handles(&self) -> Vec<HostHandle> {
        let list = self.host.children(self.container).unwrap()[0];
        self.host.children(list).unwrap()
    }
}

fn keyed_list(keys: &[i64]) -> Element {
    let items: Vec<_> = keys
        .iter()
        .map(|&k| Element::host("li").with_key(k).children(k))
        .collect();
    Element::host("ul").children(items)
}

fn labelled_list(labels: &[&str]) -> Element {
    let items: Vec<_> = labels
        .iter()
        .map(|&label| Element::host("li").with_key(label).children(label))
        .collect();
    Element::host("ul").children(items)
}

fn structural_ops(ops: &[HostOp]) -> Vec<&HostOp> {
    ops.iter()
        .filter(|op| {
            matches!(
                op,
                HostOp::CreateElement { .. }
                    | HostOp::CreateText { .. }
                    | HostOp::AppendChild { .. }
                    | HostOp::InsertBefore { .. }
                    | HostOp::RemoveChild { .. }
            )
        })
        .collect()
}

/// Test that rendering waits for the scheduler.
#[test]
fn render_is_deferred_until_flush() {
    let fx = Fixture::new();

    fx.root.render(Element::host("p").children("hi"));

    assert_eq!(fx.markup(), "");
    assert_eq!(fx.scheduler.pending(), 1);
    assert_eq!(fx.boundary.requests(), 1);

    fx.scheduler.flush_work();
    assert_eq!(fx.markup(), "<p>hi</p>");
    assert!(fx.root.last_commit().is_some());
}

/// Test the keyed reorder with an insertion and a deletion.
#[test]
fn keyed_reorder_end_to_end() {
    let fx = Fixture::new();
    fx.show(keyed_list(&[0, 1, 2, 3]));
    let before = fx.list_handles();

    fx.show(keyed_list(&[2, 1, 3, 4]));
    let summary = fx.root.last_commit().unwrap();

    assert_eq!(summary.placed_keys(), vec!["2", "4"]);
    assert_eq!(summary.deleted_keys(), vec!["0"]);
    let updated = summary.updated_keys();
    assert!(updated.contains(&"1") && updated.contains(&"3"));
    assert!(!summary.placed_keys().contains(&"1"));
    assert!(!summary.placed_keys().contains(&"3"));

    assert_eq!(fx.markup(), "<ul><li>2</li><li>1</li><li>3</li><li>4</li></ul>");
    let after = fx.list_handles();
    assert_eq!(&after[..3], &[before[2], before[1], before[3]]);
    assert!(!after.contains(&before[0]));
}

/// Test that an unchanged re-render touches nothing.
#[test]
fn unchanged_rerender_is_idempotent() {
    let fx = Fixture::new();
    fx.show(labelled_list(&["a", "b", "c"]));
    fx.host.clear_ops();

    fx.show(labelled_list(&["a", "b", "c"]));
    let summary = fx.root.last_commit().unwrap();

    assert!(summary.placed.is_empty());
    assert!(summary.deleted.is_empty());
    assert!(fx.host.ops().is_empty(), "unexpected ops: {:?}", fx.host.ops());
}

/// Test that moving one item to the front moves only that item.
#[test]
fn move_to_front_moves_one_handle() {
    let fx = Fixture::new();
    fx.show(labelled_list(&["a", "b", "c", "d"]));
    let before = fx.list_handles();
    fx.host.clear_ops();

    fx.show(labelled_list(&["d", "a", "b", "c"]));

    assert_eq!(fx.root.last_commit().unwrap().placed_keys(), vec!["d"]);
    let ops = fx.host.ops();
    let structural = structural_ops(&ops);
    assert_eq!(structural.len(), 1);
    assert!(matches!(
        structural[0],
        HostOp::InsertBefore { child, reference, .. } if *child == before[3] && *reference == before[0]
    ));
    assert_eq!(fx.list_handles(), vec![before[3], before[0], before[1], before[2]]);
}

/// Test that deleting the middle item removes exactly its handle.
#[test]
fn delete_middle_item() {
    let fx = Fixture::new();
    fx.show(labelled_list(&["a", "b", "c"]));
    let before = fx.list_handles();
    let list = fx.host.children(fx.container).unwrap()[0];
    let held = fx.host.node_count();
    fx.host.clear_ops();

    fx.show(labelled_list(&["a", "c"]));
    assert_eq!(fx.host.node_count(), held - 1);

    assert_eq!(fx.root.last_commit().unwrap().deleted_keys(), vec!["b"]);
    assert_eq!(
        fx.host.ops(),
        vec![HostOp::RemoveChild {
            parent: list,
            child: before[1]
        }]
    );
    assert_eq!(fx.list_handles(), vec![before[0], before[2]]);
}

fn counter() -> FunctionComponent {
    FunctionComponent::new("Counter", |props, hooks| {
        let step = props.int("step").unwrap_or(1);
        let (count, dispatch) = hooks.use_reducer(|count: &i64, action: i64| count + action, 0i64)?;
        let click = Listener::new(move |_event: &Event| {
            dispatch.dispatch(step);
        });
        Ok(Element::host("button")
            .attr("id", "inc")
            .attr("onClick", click)
            .children(count)
            .into())
    })
}

/// Test that reducer dispatches compose from the latest state.
#[test]
fn reducer_dispatches_compose() {
    let fx = Fixture::new();
    fx.show(counter().element().attr("step", 5i64));
    let button = fx.host.find_by_attribute(fx.container, "id", "inc").unwrap();
    assert_eq!(fx.markup(), r#"<button id="inc">0</button>"#);

    assert!(fx.host.dispatch_event(button, &Event::new("click")).unwrap());
    assert!(fx.host.dispatch_event(button, &Event::new("click")).unwrap());
    assert_eq!(fx.markup(), r#"<button id="inc">0</button>"#, "nothing renders before the flush");

    fx.scheduler.flush_work();
    assert_eq!(fx.markup(), r#"<button id="inc">10</button>"#);

    fx.host.dispatch_event(button, &Event::new("click")).unwrap();
    fx.scheduler.flush_work();
    assert_eq!(fx.markup(), r#"<button id="inc">15</button>"#);
    assert_eq!(fx.host.children(fx.container).unwrap(), vec![button]);
}

/// Test that state updates re-render only the owning component.
#[test]
fn state_update_rerenders_the_owner_only() {
    let fx = Fixture::new();
    let renders = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    let log = renders.clone();
    let toggle = FunctionComponent::new("Toggle", move |_, hooks| {
        log.lock().push("toggle");
        let (open, set_open) = hooks.use_state(false)?;
        let click = Listener::new(move |_: &Event| {
            set_open.dispatch(!open);
        });
        Ok(Children::from(vec![
            Some(Element::host("button").attr("onClick", click)),
            open.then(|| Element::host("section").children("details")),
            Some(Element::host("footer")),
        ]))
    });
    let log = renders.clone();
    let sibling = FunctionComponent::new("Sibling", move |_, _| {
        log.lock().push("sibling");
        Ok(Element::host("aside").into())
    });

    fx.show(vec![toggle.element(), sibling.element()]);
    assert_eq!(*renders.lock(), vec!["toggle", "sibling"]);
    let button = fx.host.children(fx.container).unwrap()[0];

    fx.host.dispatch_event(button, &Event::new("click")).unwrap();
    fx.scheduler.flush_work();
    assert_eq!(
        fx.markup(),
        "<button></button><section>details</section><footer></footer><aside></aside>"
    );
    assert_eq!(*renders.lock(), vec!["toggle", "sibling", "toggle"]);

    fx.host.dispatch_event(button, &Event::new("click")).unwrap();
    fx.scheduler.flush_work();
    assert_eq!(fx.markup(), "<button></button><footer></footer><aside></aside>");
}

/// Test effect firing rules for each dependency list shape.
#[test]
fn effects_follow_their_dependencies() {
    let fx = Fixture::new();
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let sink = log.clone();
    let probe = FunctionComponent::new("Probe", move |props, hooks| {
        let value = props.int("value").unwrap_or_default();
        let l = sink.clone();
        hooks.use_effect(move || l.lock().push("mount".into()), Some(deps![]))?;
        let l = sink.clone();
        hooks.use_effect(move || l.lock().push(format!("value {value}")), Some(deps![value]))?;
        let l = sink.clone();
        hooks.use_effect(move || l.lock().push("constant".into()), Some(deps!["fixed"]))?;
        let l = sink.clone();
        hooks.use_layout_effect(move || l.lock().push("layout".into()), None)?;
        Ok(Children::Empty)
    });

    fx.show(probe.element().attr("value", 1i64));
    assert_eq!(*log.lock(), vec!["layout", "mount", "value 1", "constant"]);
    assert_eq!(fx.root.last_commit().unwrap().effects_fired, 4);

    log.lock().clear();
    fx.show(probe.element().attr("value", 1i64));
    assert_eq!(*log.lock(), vec!["layout"]);

    log.lock().clear();
    fx.show(probe.element().attr("value", 2i64));
    assert_eq!(*log.lock(), vec!["layout", "value 2"]);

    log.lock().clear();
    for _ in 0..3 {
        fx.show(probe.element().attr("value", 2i64));
    }
    assert!(!log.lock().contains(&"mount".to_string()));
}

struct Greeting {
    renders: usize,
}

impl Component for Greeting {
    fn render(&mut self, props: &Props) -> RenderResult {
        self.renders += 1;
        let name = props.str("name").unwrap_or("nobody");
        Ok(Element::host("p")
            .children(format!("hello {name} #{}", self.renders))
            .into())
    }
}

/// Test that a class instance lives as long as its work node identity.
#[test]
fn class_instances_persist_across_renders() {
    let fx = Fixture::new();
    let greeting = ClassComponent::new("Greeting", |_props| Greeting { renders: 0 });

    fx.show(greeting.element().attr("name", "ada"));
    let p = fx.host.children(fx.container).unwrap()[0];
    fx.show(greeting.element().attr("name", "grace"));

    assert_eq!(fx.markup(), "<p>hello grace #2</p>");
    assert_eq!(fx.host.children(fx.container).unwrap(), vec![p]);

    // a different key is a different identity
    fx.show(greeting.element().with_key("other").attr("name", "ada"));
    assert_eq!(fx.markup(), "<p>hello ada #1</p>");
}

/// Test fragments, text nodes and primitive component output.
#[test]
fn fragments_text_and_primitive_output() {
    let fx = Fixture::new();
    let hello = FunctionComponent::new("Hello", |_, _| Ok("hi".into()));

    fx.show(vec![
        Element::fragment(vec![Element::text("a"), Element::host("b")]),
        hello.element(),
        Element::host("p").children(7i64),
    ]);
    assert_eq!(fx.markup(), "a<b></b>hi<p>7</p>");

    fx.host.clear_ops();
    fx.show(vec![
        Element::fragment(vec![Element::text("z"), Element::host("b")]),
        hello.element(),
        Element::host("p").children(8i64),
    ]);
    assert_eq!(fx.markup(), "z<b></b>hi<p>8</p>");
    assert!(structural_ops(&fx.host.ops()).is_empty());
}

/// Test that keyed fragments move their host nodes together.
#[test]
fn keyed_fragments_move_as_a_unit() {
    let fx = Fixture::new();
    let x = |tag: &str| Element::host(tag);
    let render = |order: &[&str]| {
        order
            .iter()
            .map(|&key| match key {
                "x" => Element::fragment(vec![x("h1"), x("h2")]).with_key("x"),
                _ => Element::fragment(vec![x("h3")]).with_key("y"),
            })
            .collect::<Vec<_>>()
    };

    fx.show(render(&["x", "y"]));
    assert_eq!(fx.markup(), "<h1></h1><h2></h2><h3></h3>");

    fx.show(render(&["y", "x"]));
    assert_eq!(fx.markup(), "<h3></h3><h1></h1><h2></h2>");
    assert_eq!(fx.root.last_commit().unwrap().placed_keys(), vec!["y"]);
}

/// Test anchor search through handle-less component parents.
#[test]
fn insertions_between_components_find_their_anchor() {
    let fx = Fixture::new();
    let item = FunctionComponent::new("Item", |props, _| {
        let label = props.str("label").unwrap_or_default().to_string();
        Ok(Element::host("li").children(label).into())
    });
    let list = |labels: &[&str]| {
        let items: Vec<_> = labels
            .iter()
            .map(|&label| item.element().with_key(label).attr("label", label))
            .collect();
        Element::host("ul").children(items)
    };

    fx.show(list(&["a", "c"]));
    fx.show(list(&["a", "b", "c"]));
    assert_eq!(fx.markup(), "<ul><li>a</li><li>b</li><li>c</li></ul>");

    fx.show(list(&["c", "a", "b"]));
    assert_eq!(fx.markup(), "<ul><li>c</li><li>a</li><li>b</li></ul>");
    assert_eq!(fx.root.last_commit().unwrap().placed_keys(), vec!["c"]);
}

/// Test that hook-order violations abandon the render.
#[test]
fn hook_order_violation_fails_the_render() {
    let flaky = FunctionComponent::new("Flaky", |props, hooks| {
        hooks.use_state(0i64)?;
        if props.bool("extra").unwrap_or(false) {
            hooks.use_state(String::new())?;
        }
        Ok(Element::host("p").children("ok").into())
    });

    let fx = Fixture::new();
    fx.show(flaky.element());
    fx.show(flaky.element().attr("extra", true));

    assert!(matches!(
        fx.root.last_error(),
        Some(RenderError::Hook(HookError::ExtraHook { index: 1 }))
    ));
    assert_eq!(fx.markup(), "<p>ok</p>");

    // lenient roots repair the slot list instead
    let fx = Fixture::with_config(RootConfig {
        strict_hooks: false,
        ..RootConfig::default()
    });
    fx.show(flaky.element());
    fx.show(flaky.element().attr("extra", true));
    assert!(fx.root.last_error().is_none());
}

/// Test that component failures are recorded and leave the tree alone.
#[test]
fn component_errors_are_recorded() {
    let fx = Fixture::new();
    let broken = FunctionComponent::new("Broken", |_, _| Err(RenderError::component("Broken", "no data")));

    fx.show(Element::host("p"));
    fx.show(broken.element());

    let err = fx.root.last_error().unwrap();
    assert_eq!(err.to_string(), "component `Broken` failed: no data");
    assert_eq!(fx.markup(), "<p></p>");
}

/// Test that an abandoned pass does not swallow an effect's new dependencies.
#[test]
fn failed_pass_does_not_commit_effect_dependencies() {
    let fx = Fixture::new();
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let sink = log.clone();
    let watcher = FunctionComponent::new("Watcher", move |props, hooks| {
        let value = props.int("value").unwrap_or_default();
        let l = sink.clone();
        hooks.use_effect(move || l.lock().push(format!("value {value}")), Some(deps![value]))?;
        Ok(Children::Empty)
    });
    let gate = FunctionComponent::new("Gate", |props, _| {
        if props.bool("fail").unwrap_or(false) {
            return Err(RenderError::component("Gate", "closed"));
        }
        Ok(Element::host("p").into())
    });
    let tree = |value: i64, fail: bool| {
        vec![
            watcher.element().attr("value", value),
            gate.element().attr("fail", fail),
        ]
    };

    fx.show(tree(1, false));
    fx.show(tree(2, true));
    assert!(fx.root.last_error().is_some());
    assert_eq!(*log.lock(), vec!["value 1"]);

    fx.show(tree(2, false));
    assert!(fx.root.last_error().is_none());
    assert_eq!(*log.lock(), vec!["value 1", "value 2"]);
}

/// Test unmounting and dispatching to an unmounted component.
#[test]
fn unmount_clears_the_container() {
    let fx = Fixture::new();
    let setter: Arc<Mutex<Option<SetState<i64>>>> = Arc::new(Mutex::new(None));

    let slot = setter.clone();
    let holder = FunctionComponent::new("Holder", move |_, hooks| {
        let (value, set) = hooks.use_state(1i64)?;
        *slot.lock() = Some(set);
        Ok(Element::host("span").children(value).into())
    });

    fx.show(holder.element());
    assert_eq!(fx.markup(), "<span>1</span>");

    fx.root.unmount();
    fx.scheduler.flush_work();
    assert_eq!(fx.markup(), "");
    assert!(fx.root.work_tree().unwrap().children.is_empty());

    let set = setter.lock().take().unwrap();
    assert!(!set.dispatch(2));
    assert_eq!(fx.scheduler.pending(), 0);
}

/// Test that a root honours a JSON config.
#[test]
fn root_from_json_config() {
    let config = Config::from_json(r#"{ "root": { "container_tag": "app" } }"#).unwrap();
    let host = MemoryHost::new();
    let container = host.create_container("main");
    let (scheduler, _) = Scheduler::manual();
    let root = Root::from_config(host.clone(), container, &scheduler, &config);

    root.render(Element::host("p"));
    scheduler.flush_work();

    let tree = root.work_tree().unwrap();
    assert_eq!(tree.name, "app");
    assert_eq!(tree.children[0].name, "p");
    assert_eq!(host.to_markup(container).unwrap(), "<main><p></p></main>");
}

/// Test the tokio-backed macrotask boundary.
#[tokio::test]
async fn tokio_boundary_flushes_on_the_runtime() {
    let host = MemoryHost::new();
    let container = host.create_container("div");
    let scheduler = Scheduler::new(TokioMacrotask::try_current().unwrap());
    let root = create_root(host.clone(), container, &scheduler);

    root.render(counter().element());
    let (tx, rx) = tokio::sync::oneshot::channel();
    scheduler.schedule_callback(move || {
        let _ = tx.send(());
    });
    rx.await.unwrap();
    assert_eq!(host.inner_markup(container).unwrap(), r#"<button id="inc">0</button>"#);

    let button = host.find_by_attribute(container, "id", "inc").unwrap();
    host.dispatch_event(button, &Event::new("click")).unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel();
    scheduler.schedule_callback(move || {
        let _ = tx.send(());
    });
    rx.await.unwrap();
    assert_eq!(host.inner_markup(container).unwrap(), r#"<button id="inc">1</button>"#);
}
