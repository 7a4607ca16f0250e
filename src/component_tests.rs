#[cfg(test)]
mod tests {
    use crate::component::Component;
    use crate::definition::ComponentDefinition;
    use crate::dom::NodeId;
    use crate::error::MethodError;
    use crate::host::HostElement;
    use serde_json::{json, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    fn mount(definition: Rc<ComponentDefinition>, attributes: &[(&str, &str)]) -> Component {
        let host = attributes
            .iter()
            .fold(HostElement::new("ao-test"), |h, (n, v)| h.with_attribute(n, v));
        let mut component = Component::new(definition, host);
        component.connect();
        component
    }

    fn visible(component: &Component, tag: &str) -> Vec<NodeId> {
        let doc = component.document().unwrap();
        doc.find_by_tag(tag)
            .into_iter()
            .filter(|&id| doc.is_visible(id))
            .collect()
    }

    fn texts(component: &Component, tag: &str) -> Vec<String> {
        let doc = component.document().unwrap();
        visible(component, tag)
            .into_iter()
            .map(|id| doc.text_content(id))
            .collect()
    }

    fn by_text(component: &Component, tag: &str, text: &str) -> NodeId {
        let doc = component.document().unwrap();
        visible(component, tag)
            .into_iter()
            .find(|&id| doc.text_content(id).trim() == text)
            .unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // BINDINGS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_text_binding_round_trip() {
        let def = ComponentDefinition::builder("Echo")
            .template("<p>{{ p }}</p><div>value: {{ p }}</div>")
            .state("p", "")
            .build();
        let mut c = mount(def, &[]);

        let cases = [
            (json!("hello"), "hello"),
            (json!(42), "42"),
            (json!(-1.5), "-1.5"),
            (json!(true), "true"),
            (json!(false), "false"),
            (json!(0), "0"),
        ];
        for (value, expected) in cases {
            c.write_state("p", value);
            assert_eq!(texts(&c, "p"), vec![expected.to_string()]);
            assert_eq!(texts(&c, "div"), vec![format!("value: {}", expected)]);
        }
    }

    #[test]
    fn test_nested_path_binding() {
        let def = ComponentDefinition::builder("Profile")
            .template(r#"<p>{{ user.name }}</p><a title="{{ user.name }}!">x</a>"#)
            .state("user", json!({"name": "Ana"}))
            .build();
        let mut c = mount(def, &[]);
        assert_eq!(texts(&c, "p"), vec!["Ana"]);

        c.write_state("user", json!({"name": "Bo"}));
        assert_eq!(texts(&c, "p"), vec!["Bo"]);
        let a = visible(&c, "a")[0];
        assert_eq!(c.document().unwrap().attribute(a, "title"), Some("Bo!"));
    }

    #[test]
    fn test_missing_path_renders_empty() {
        let def = ComponentDefinition::builder("Empty")
            .template("<p>{{ user.address.city }}</p><b>{{ nothing }}</b>")
            .state("user", json!({"name": "Ana"}))
            .build();
        let c = mount(def, &[]);
        assert_eq!(c.html(), "<p></p><b></b>");
    }

    #[test]
    fn test_placeholders_are_static() {
        let def = ComponentDefinition::builder("Card")
            .template("<h1>[[ title ]]</h1><p>{{ title }}</p>")
            .input("title", "Untitled")
            .build();
        let mut c = mount(def, &[("title", "Hello")]);
        assert_eq!(texts(&c, "h1"), vec!["Hello"]);
        assert_eq!(texts(&c, "p"), vec!["Hello"]);

        c.write_state("title", "Changed");
        assert_eq!(texts(&c, "h1"), vec!["Hello"]);
        assert_eq!(texts(&c, "p"), vec!["Changed"]);
        assert_eq!(c.host().attribute("title"), Some("Changed"));
    }

    #[test]
    fn test_function_bindings_recompute_on_every_write() {
        let def = ComponentDefinition::builder("Cart")
            .template("<p>{{ total() }}</p>")
            .state("items", json!([1, 2]))
            .state("unrelated", 0)
            .expose("total", |ctx, _| {
                let items = ctx.get("items").unwrap_or(Value::Null);
                let sum: i64 = items
                    .as_array()
                    .map(|a| a.iter().filter_map(Value::as_i64).sum::<i64>())
                    .unwrap_or(0);
                Ok(json!(sum))
            })
            .build();
        let mut c = mount(def, &[]);
        assert_eq!(texts(&c, "p"), vec!["3"]);

        c.write_state("items", json!([1, 2, 3, 4]));
        assert_eq!(texts(&c, "p"), vec!["10"]);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // DIRECTIVES
    // ═══════════════════════════════════════════════════════════════════════════════

    fn list(items: Value) -> Rc<ComponentDefinition> {
        ComponentDefinition::builder("List")
            .template(r#"<ul><li *for="item of items">{{ item }}</li></ul>"#)
            .state("items", items)
            .build()
    }

    #[test]
    fn test_for_rematerialization_is_idempotent() {
        let mut c = mount(list(json!(["a", "b", "c"])), &[]);
        c.refresh();
        c.refresh();
        assert_eq!(texts(&c, "li"), vec!["a", "b", "c"]);
        assert_eq!(c.document().unwrap().find_by_tag("li").len(), 4);
    }

    #[test]
    fn test_for_reacts_to_mutation() {
        let mut c = mount(list(json!(["a", "b", "c"])), &[]);
        c.write_state("items", json!(["x"]));
        assert_eq!(texts(&c, "li"), vec!["x"]);
        assert_eq!(c.document().unwrap().find_by_tag("li").len(), 2);

        c.write_state("items", json!([]));
        assert!(texts(&c, "li").is_empty());
    }

    #[test]
    fn test_table_rows_repeat_at_top_level() {
        let def = ComponentDefinition::builder("Rows")
            .template(r#"<tr *for="r of rows"><td>{{ r }}</td></tr>"#)
            .state("rows", json!(["a", "b"]))
            .build();
        let mut c = mount(def, &[]);
        assert_eq!(texts(&c, "td"), vec!["a", "b"]);
        assert_eq!(
            c.html(),
            r#"<tr><td>a</td></tr><tr><td>b</td></tr><tr style="display: none"><td></td></tr>"#
        );

        c.write_state("rows", json!(["c"]));
        assert_eq!(texts(&c, "td"), vec!["c"]);
    }

    #[test]
    fn test_if_toggles_visibility() {
        let def = ComponentDefinition::builder("Flag")
            .template(r#"<div *if="flag">shown</div><span *if="!flag">other</span>"#)
            .state("flag", true)
            .build();
        let mut c = mount(def, &[]);
        let div = c.document().unwrap().find_by_tag("div")[0];
        assert!(c.document().unwrap().is_visible(div));
        assert!(visible(&c, "span").is_empty());

        c.write_state("flag", false);
        let doc = c.document().unwrap();
        assert_eq!(doc.find_by_tag("div"), vec![div]);
        assert!(!doc.is_visible(div));
        assert_eq!(visible(&c, "span").len(), 1);
        assert_eq!(c.html(), r#"<div style="display: none">shown</div><span>other</span>"#);
    }

    #[test]
    fn test_if_with_exposed_call() {
        let def = ComponentDefinition::builder("Gate")
            .template(r#"<p *if="ready()">ok</p><i *if="hidden()">no</i>"#)
            .state("count", 0)
            .expose("ready", |ctx, _| Ok(json!(ctx.get_i64("count") > 1)))
            .method("hidden", |_, _| Ok(json!(true)))
            .build();
        let mut c = mount(def, &[]);
        assert!(visible(&c, "p").is_empty());
        assert!(visible(&c, "i").is_empty());

        c.write_state("count", 2);
        assert_eq!(visible(&c, "p").len(), 1);
        assert!(visible(&c, "i").is_empty());
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INTERACTION
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_only_exposed_methods_run_on_click() {
        let increments = Rc::new(Cell::new(0));
        let secrets = Rc::new(Cell::new(0));
        let (inc, sec) = (Rc::clone(&increments), Rc::clone(&secrets));

        let def = ComponentDefinition::builder("Gate")
            .template(r#"<button (click)="increment()">inc</button><button data-click="secret()">sec</button>"#)
            .expose("increment", move |_, _| {
                inc.set(inc.get() + 1);
                Ok(Value::Null)
            })
            .method("secret", move |_, _| {
                sec.set(sec.get() + 1);
                Ok(Value::Null)
            })
            .build();
        let mut c = mount(def, &[]);

        let secret = by_text(&c, "button", "sec");
        c.click(secret);
        assert_eq!(secrets.get(), 0);

        let increment = by_text(&c, "button", "inc");
        c.click(increment);
        assert_eq!(increments.get(), 1);
        c.click(increment);
        assert_eq!(increments.get(), 2);
    }

    #[test]
    fn test_two_way_binding_settles() {
        let renders = Rc::new(Cell::new(0));
        let counter = Rc::clone(&renders);
        let def = ComponentDefinition::builder("Simpleform")
            .template(r#"<input (value)="name"><p>{{ name }}</p><i>{{ tick() }}</i>"#)
            .state("name", "Bob")
            .expose("tick", move |_, _| {
                counter.set(counter.get() + 1);
                Ok(Value::Null)
            })
            .build();
        let mut c = mount(def, &[]);
        let input = visible(&c, "input")[0];
        assert_eq!(c.document().unwrap().value(input).as_deref(), Some("Bob"));

        let before = renders.get();
        assert!(c.input(input, "Zed"));
        assert_eq!(c.get("name"), Some(json!("Zed")));
        assert_eq!(c.document().unwrap().value(input).as_deref(), Some("Zed"));
        assert_eq!(texts(&c, "p"), vec!["Zed"]);
        assert_eq!(renders.get(), before + 1);
    }

    #[test]
    fn test_change_and_keyup_also_write() {
        let def = ComponentDefinition::builder("Form")
            .template(r#"<input (value)="user.name">"#)
            .state("user", json!({"name": "Bob", "age": 3}))
            .build();
        let mut c = mount(def, &[]);
        let input = visible(&c, "input")[0];

        assert!(c.dispatch(input, &crate::component::Event::with_value("keyup", "Al")));
        assert_eq!(c.get("user"), Some(json!({"name": "Al", "age": 3})));
        assert!(c.dispatch(input, &crate::component::Event::with_value("change", "Cy")));
        assert_eq!(c.get("user.name"), Some(json!("Cy")));
        assert!(!c.dispatch(input, &crate::component::Event::new("click")));
    }

    #[test]
    fn test_control_in_loop_writes_collection_item() {
        let def = ComponentDefinition::builder("People")
            .template(r#"<ul><li *for="item of people"><input (value)="item.name"><b>{{ item.name }}</b></li></ul>"#)
            .state("people", json!([{"name": "a"}, {"name": "b"}]))
            .build();
        let mut c = mount(def, &[]);
        let second = visible(&c, "input")[1];

        assert!(c.input(second, "Zed"));
        assert_eq!(c.get("people"), Some(json!([{"name": "a"}, {"name": "Zed"}])));
        assert!(c.get("item").is_none());
        assert_eq!(texts(&c, "b"), vec!["a", "Zed"]);

        let doc = c.document().unwrap();
        let values: Vec<_> = visible(&c, "input")
            .into_iter()
            .filter_map(|input| doc.value(input))
            .collect();
        assert_eq!(values, vec!["a", "Zed"]);
    }

    #[test]
    fn test_control_in_nested_loop_writes_through_both_collections() {
        let def = ComponentDefinition::builder("Grid")
            .template(r#"<div *for="row of rows"><input *for="cell of row" (value)="cell"></div>"#)
            .state("rows", json!([["a", "b"], ["c"]]))
            .build();
        let mut c = mount(def, &[]);
        let third = visible(&c, "input")[2];

        assert!(c.input(third, "Z"));
        assert_eq!(c.get("rows"), Some(json!([["a", "b"], ["Z"]])));
        assert!(c.get("cell").is_none());
        assert!(c.get("row").is_none());
    }

    #[test]
    fn test_control_bound_to_index_is_not_written() {
        let def = ComponentDefinition::builder("Indexed")
            .template(r#"<ul><li *for="item of items"><input (value)="$index"></li></ul>"#)
            .state("items", json!(["a"]))
            .build();
        let mut c = mount(def, &[]);
        let input = visible(&c, "input")[0];

        c.input(input, "5");
        assert_eq!(c.state().len(), 1);
        assert_eq!(c.get("items"), Some(json!(["a"])));
    }

    #[test]
    fn test_function_bindings_in_clones_run_once_per_write() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let def = ComponentDefinition::builder("Tags")
            .template(r#"<ul><li *for="tag of tags"><b>{{ tag }}</b><i>{{ suffix() }}</i></li></ul>"#)
            .state("tags", json!(["a", "b"]))
            .expose("suffix", move |_, _| {
                counter.set(counter.get() + 1);
                Ok(json!("!"))
            })
            .build();
        let mut c = mount(def, &[]);
        assert_eq!(texts(&c, "i"), vec!["!", "!"]);

        calls.set(0);
        c.write_state("tags", json!(["a", "b", "c"]));
        assert_eq!(calls.get(), 3);
        assert_eq!(texts(&c, "b"), vec!["a", "b", "c"]);
        assert_eq!(texts(&c, "i"), vec!["!", "!", "!"]);
    }

    #[test]
    fn test_counter() {
        let def = ComponentDefinition::builder("Counter")
            .template(
                r#"<button (click)="subtractCounter()">-</button><span>{{ count }}</span><button (click)="addCounter()">+</button><button (click)="resetCounter">reset</button>"#,
            )
            .state("count", 0)
            .expose("addCounter", |ctx, _| {
                let n = ctx.get_i64("count");
                ctx.set("count", n + 1);
                Ok(Value::Null)
            })
            .expose("subtractCounter", |ctx, _| {
                let n = ctx.get_i64("count");
                ctx.set("count", n - 1);
                Ok(Value::Null)
            })
            .expose("resetCounter", |ctx, _| {
                ctx.set("count", 0);
                Ok(Value::Null)
            })
            .build();
        let mut c = mount(def, &[]);
        let plus = by_text(&c, "button", "+");
        let minus = by_text(&c, "button", "-");
        let reset = by_text(&c, "button", "reset");

        c.click(plus);
        c.click(plus);
        c.click(minus);
        assert_eq!(texts(&c, "span"), vec!["1"]);
        c.click(reset);
        assert_eq!(texts(&c, "span"), vec!["0"]);
    }

    #[test]
    fn test_click_bubbles_to_ancestor_listener() {
        let def = ComponentDefinition::builder("Bubble")
            .template(r#"<div (click)="hit()"><b>inner</b></div>"#)
            .state("hits", 0)
            .expose("hit", |ctx, _| {
                let n = ctx.get_i64("hits");
                ctx.set("hits", n + 1);
                Ok(Value::Null)
            })
            .build();
        let mut c = mount(def, &[]);
        let b = visible(&c, "b")[0];
        assert!(c.click(b));
        assert_eq!(c.get("hits"), Some(json!(1)));
    }

    #[test]
    fn test_failing_handler_still_paints_partial_writes() {
        let def = ComponentDefinition::builder("Fragile")
            .template(r#"<span>{{ count }}</span><button (click)="explode()">go</button>"#)
            .state("count", 0)
            .expose("explode", |ctx, _| {
                ctx.set("count", 5);
                Err(MethodError::failed("boom"))
            })
            .build();
        let mut c = mount(def, &[]);
        let button = by_text(&c, "button", "go");
        c.click(button);
        assert_eq!(texts(&c, "span"), vec!["5"]);
    }

    #[test]
    fn test_argument_resolution_order() {
        let def = ComponentDefinition::builder("Args")
            .template(r#"<button (click)="say('count', count, 4, missing)">go</button>"#)
            .state("count", 9)
            .state("said", Value::Null)
            .expose("say", |ctx, args| {
                ctx.set("said", Value::Array(args.to_vec()));
                Ok(Value::Null)
            })
            .build();
        let mut c = mount(def, &[]);
        let button = by_text(&c, "button", "go");
        c.click(button);
        assert_eq!(c.get("said"), Some(json!(["count", 9, 4, "missing"])));
    }

    #[test]
    fn test_list_remove_uses_captured_item() {
        let def = ComponentDefinition::builder("List")
            .template(
                r#"<ul><li *for="let item of items"><span>{{ item }}</span><button (click)="removeItem(item)">x</button></li></ul><button (click)="addItem()">add</button>"#,
            )
            .state("items", json!(["Item 1", "Item 2", "Item 3"]))
            .expose("addItem", |ctx, _| {
                let mut items = ctx.get("items").and_then(|v| v.as_array().cloned()).unwrap_or_default();
                items.push(json!(format!("Item {}", items.len() + 1)));
                ctx.set("items", items);
                Ok(Value::Null)
            })
            .expose("removeItem", |ctx, args| {
                let target = args.first().cloned().ok_or_else(|| MethodError::InvalidArgument("item".into()))?;
                let mut items = ctx.get("items").and_then(|v| v.as_array().cloned()).unwrap_or_default();
                items.retain(|i| *i != target);
                ctx.set("items", items);
                Ok(Value::Null)
            })
            .build();
        let mut c = mount(def, &[]);
        assert_eq!(texts(&c, "span"), vec!["Item 1", "Item 2", "Item 3"]);

        let second_li = visible(&c, "li")[1];
        let remove = c
            .document()
            .unwrap()
            .subtree(second_li)
            .into_iter()
            .find(|&id| c.document().unwrap().tag(id) == Some("button"))
            .unwrap();
        c.click(remove);
        assert_eq!(texts(&c, "span"), vec!["Item 1", "Item 3"]);

        let add = by_text(&c, "button", "add");
        c.click(add);
        assert_eq!(texts(&c, "span"), vec!["Item 1", "Item 3", "Item 3"]);
        assert_eq!(visible(&c, "li").len(), 3);
    }

    #[test]
    fn test_object_items_are_passed_whole() {
        let def = ComponentDefinition::builder("ObjList")
            .template(
                r#"<ul><li *for="item of objItems" data-id="{{ item.id }}"><button (click)="removeObjItem(item)">{{ item.name }}</button></li></ul>"#,
            )
            .state("objItems", json!([{"id": 1, "name": "One"}, {"id": 2, "name": "Two"}]))
            .expose("removeObjItem", |ctx, args| {
                let id = args.first().and_then(|a| a.get("id")).cloned().unwrap_or(Value::Null);
                let mut items = ctx.get("objItems").and_then(|v| v.as_array().cloned()).unwrap_or_default();
                items.retain(|i| i.get("id") != Some(&id));
                ctx.set("objItems", items);
                Ok(Value::Null)
            })
            .build();
        let mut c = mount(def, &[]);
        let ids: Vec<_> = visible(&c, "li")
            .into_iter()
            .filter_map(|li| c.document().unwrap().attribute(li, "data-id").map(str::to_string))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);

        let one = by_text(&c, "button", "One");
        c.click(one);
        assert_eq!(texts(&c, "button"), vec!["Two"]);
    }
}
