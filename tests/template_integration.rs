//! Integration tests for the template engine
//!
//! These tests drive the store, validator and renderer together through the
//! public API, without starting a server.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use ara_notification_templates::template::{
    evaluate, substitute, validate, Bindings, CreateEmailRequest, CreateLocaleRequest,
    CreateSmsRequest, CreateTemplateRequest, Diagnostic, Locale, Renderer, Template,
    TemplateError, TemplateRef, TemplateService, TemplateStore, VariableType, Violation,
    ViolationKind, DEFAULT_MAX_DEPTH,
};

/// Store with `en-US` and `fr-FR` locales
fn create_store() -> Arc<TemplateStore> {
    let store = Arc::new(TemplateStore::new());
    for (id, name) in [("en-US", "English (US)"), ("fr-FR", "Français")] {
        store
            .create_locale(Locale::from(CreateLocaleRequest {
                id: id.to_string(),
                name: name.to_string(),
            }))
            .unwrap();
    }
    store
}

fn create_service() -> TemplateService {
    TemplateService::new(create_store(), DEFAULT_MAX_DEPTH)
}

fn add_template(service: &TemplateService, name: &str, vars: &[(&str, VariableType)]) -> Template {
    service
        .store()
        .create_template(Template::from(CreateTemplateRequest {
            name: name.to_string(),
            variables: vars.iter().map(|(n, t)| (n.to_string(), *t)).collect(),
        }))
        .unwrap()
}

/// Store sms content without validation, so broken graphs can be built
fn add_raw_sms(service: &TemplateService, template: &Template, content: &str) {
    service
        .store()
        .create_sms(
            template,
            CreateSmsRequest {
                locale: "en-US".to_string(),
                content: content.to_string(),
            },
        )
        .unwrap();
}

fn bindings(value: Value) -> Bindings {
    value.as_object().cloned().unwrap_or_default()
}

// =============================================================================
// Substitution & Conditionals
// =============================================================================

mod text_tests {
    use super::*;

    #[test]
    fn test_substitute_examples() {
        assert_eq!(
            substitute("Hello {name}", &bindings(json!({"name": "Bob"}))),
            "Hello Bob"
        );

        let missing = substitute("{x}", &Bindings::new());
        assert!(missing.contains('x'));
        assert!(missing.starts_with("!!!"));
    }

    #[test]
    fn test_evaluate_flag() {
        let text = "[if flag]A[else]B[fi]";
        assert_eq!(evaluate(text, &bindings(json!({"flag": true}))), "A");
        assert_eq!(evaluate(text, &bindings(json!({"flag": false}))), "B");
        assert_eq!(evaluate(text, &Bindings::new()), "B");
    }

    #[test]
    fn test_evaluate_comparison() {
        let text = "[if age ge 18]Adult[else]Minor[fi]";
        assert_eq!(evaluate(text, &bindings(json!({"age": 18}))), "Adult");
        assert_eq!(evaluate(text, &bindings(json!({"age": 17}))), "Minor");
    }

    #[test]
    fn test_evaluate_multiline_block() {
        let text = "Dear customer,\n[if vip]\nThanks for being a member.\n[else]\nJoin today!\n[fi]\nBye";
        assert_eq!(
            evaluate(text, &bindings(json!({"vip": "yes"}))),
            "Dear customer,\n\nThanks for being a member.\n\nBye"
        );
    }
}

// =============================================================================
// Rendering
// =============================================================================

mod render_tests {
    use super::*;

    #[test]
    fn test_plain_content_renders_verbatim() {
        let service = create_service();
        let t = add_template(&service, "plain", &[]);
        add_raw_sms(&service, &t, "Nothing to see here: 100% plain, [not a block]");

        let outcome = service.render_sms(TemplateRef::Name("plain"), "en-US", &Bindings::new()).unwrap();
        assert_eq!(outcome.output, "Nothing to see here: 100% plain, [not a block]");
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_embedded_signoff() {
        let service = create_service();
        let signoff = add_template(&service, "signoff", &[]);
        add_raw_sms(&service, &signoff, "Bye!");
        let greeting = add_template(&service, "greeting", &[("name", VariableType::String)]);
        add_raw_sms(&service, &greeting, "Hello {name}, #signoff#");

        let outcome = service
            .render_sms(TemplateRef::Name("greeting"), "en-US", &bindings(json!({"name": "Sam"})))
            .unwrap();
        assert_eq!(outcome.output, "Hello Sam, Bye!");
    }

    #[test]
    fn test_missing_embedded_template() {
        let service = create_service();
        let t = add_template(&service, "host", &[]);
        add_raw_sms(&service, &t, "#ghost#");

        let outcome = service.render_sms(TemplateRef::Name("host"), "en-US", &Bindings::new()).unwrap();
        assert!(outcome.output.contains("ghost"));
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::MissingTemplate {
                template: "ghost".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_locale_content_names_template_and_locale() {
        let service = create_service();
        let footer = add_template(&service, "footer", &[]);
        add_raw_sms(&service, &footer, "Bye");
        let t = add_template(&service, "host", &[]);
        service
            .store()
            .create_sms(
                &t,
                CreateSmsRequest {
                    locale: "fr-FR".to_string(),
                    content: "Salut #footer#".to_string(),
                },
            )
            .unwrap();

        let outcome = service.render_sms(TemplateRef::Name("host"), "fr-FR", &Bindings::new()).unwrap();
        assert!(outcome.output.contains("footer"));
        assert!(outcome.output.contains("fr-FR"));
    }

    #[test]
    fn test_self_reference_is_bounded() {
        let service = create_service();
        let t = add_template(&service, "loop", &[]);
        add_raw_sms(&service, &t, "again #loop#");

        let outcome = service.render_sms(TemplateRef::Name("loop"), "en-US", &Bindings::new()).unwrap();
        assert_eq!(outcome.output, "again !!!#loop# circular reference!!!");
    }

    #[test]
    fn test_deep_chain_hits_depth_cap() {
        let store = create_store();
        let service = TemplateService::new(store, 3);
        let names = ["a", "b", "c", "d"];
        for (i, name) in names.iter().enumerate() {
            let t = add_template(&service, name, &[]);
            let content = match names.get(i + 1) {
                Some(next) => format!("{}>#{}#", name, next),
                None => name.to_string(),
            };
            add_raw_sms(&service, &t, &content);
        }

        let outcome = service.render_sms(TemplateRef::Name("a"), "en-US", &Bindings::new()).unwrap();
        assert_eq!(
            outcome.output,
            "a>b>c>!!!#d# exceeds maximum embedding depth of 3!!!"
        );
    }

    #[test]
    fn test_email_fields_render_independently() {
        let service = create_service();
        let brand = add_template(&service, "brand", &[]);
        service
            .store()
            .create_email(
                &brand,
                CreateEmailRequest {
                    locale: "en-US".to_string(),
                    subject: "ACME".to_string(),
                    text: "ACME Inc.".to_string(),
                    html: "<b>ACME</b>".to_string(),
                },
            )
            .unwrap();

        let t = add_template(&service, "welcome", &[("name", VariableType::String)]);
        service
            .create_email(
                &t.id,
                CreateEmailRequest {
                    locale: "en-US".to_string(),
                    subject: "Welcome to #brand#".to_string(),
                    text: "Hi {name}, from #brand#".to_string(),
                    html: "<p>Hi {name}</p>#brand#".to_string(),
                },
            )
            .unwrap();

        let outcome = service
            .render_email(
                TemplateRef::Name("welcome"),
                "en-US",
                &bindings(json!({"name": "Ann"})),
            )
            .unwrap();
        assert_eq!(outcome.output.subject, "Welcome to ACME");
        assert_eq!(outcome.output.text, "Hi Ann, from ACME Inc.");
        assert_eq!(outcome.output.html, "<p>Hi Ann</p><b>ACME</b>");
    }

    #[test]
    fn test_declared_number_coerces_string_binding() {
        let service = create_service();
        let t = add_template(&service, "stock", &[("count", VariableType::Number)]);
        service
            .create_sms(
                &t.id,
                CreateSmsRequest {
                    locale: "en-US".to_string(),
                    content: "[if count lt 10]Low[else]Plenty[fi]".to_string(),
                },
            )
            .unwrap();

        let outcome = service
            .render_sms(TemplateRef::Name("stock"), "en-US", &bindings(json!({"count": "9"})))
            .unwrap();
        assert_eq!(outcome.output, "Low");
    }

    #[test]
    fn test_concurrent_renders_are_independent() {
        let service = Arc::new(create_service());
        let t = add_template(&service, "greeting", &[("name", VariableType::String)]);
        add_raw_sms(&service, &t, "Hello {name}");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || {
                    let name = format!("user{}", i);
                    let outcome = service
                        .render_sms(
                            TemplateRef::Name("greeting"),
                            "en-US",
                            &bindings(json!({ "name": name })),
                        )
                        .unwrap();
                    assert_eq!(outcome.output, format!("Hello {}", name));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_render_by_template_id() {
        let service = create_service();
        let t = add_template(&service, "receipt", &[("total", VariableType::Number)]);
        add_raw_sms(&service, &t, "Total: {total}");

        let vars = bindings(json!({"total": 42}));
        let by_id = service
            .render_sms(TemplateRef::Id(&t.id), "en-US", &vars)
            .unwrap();
        assert_eq!(by_id.output, "Total: 42");

        let by_name = service
            .render_sms(TemplateRef::Name("receipt"), "en-US", &vars)
            .unwrap();
        assert_eq!(by_name.output, by_id.output);
    }

    #[test]
    fn test_conditional_value_from_bindings() {
        let service = create_service();
        let t = add_template(
            &service,
            "plan",
            &[("plan", VariableType::String), ("target", VariableType::String)],
        );
        service
            .create_sms(
                &t.id,
                CreateSmsRequest {
                    locale: "en-US".to_string(),
                    content: "[if plan eq {target}]same[else]diff[fi]".to_string(),
                },
            )
            .unwrap();

        let vars = bindings(json!({"plan": "gold", "target": "gold"}));
        let outcome = service
            .render_sms(TemplateRef::Name("plan"), "en-US", &vars)
            .unwrap();
        assert_eq!(outcome.output, "same");

        let content = "[if plan eq {target}]same[else]diff[fi]";
        assert_eq!(evaluate(&substitute(content, &vars), &vars), outcome.output);
    }

    #[test]
    fn test_shared_embed_at_different_depths() {
        let service = TemplateService::new(create_store(), 3);
        for (name, content) in [("a", "A #b#"), ("b", "B #c#"), ("c", "C")] {
            let t = add_template(&service, name, &[]);
            add_raw_sms(&service, &t, content);
        }
        let root = add_template(&service, "root", &[]);
        add_raw_sms(&service, &root, "#a# | #b#");

        let outcome = service
            .render_sms(TemplateRef::Name("root"), "en-US", &Bindings::new())
            .unwrap();
        assert_eq!(
            outcome.output,
            "A B !!!#c# exceeds maximum embedding depth of 3!!! | B C"
        );
    }

    #[test]
    fn test_content_reads_during_writes() {
        let service = Arc::new(create_service());
        let seeded = add_template(&service, "seeded", &[]);
        add_raw_sms(&service, &seeded, "Hi");
        let seeded_id = service.store().template_contents(&seeded.id).unwrap()[0]
            .id()
            .to_string();

        let writers: Vec<Template> = ["alpha", "bravo", "charlie", "delta"]
            .iter()
            .map(|name| add_template(&service, name, &[]))
            .collect();

        let handles: Vec<_> = writers
            .into_iter()
            .flat_map(|template| {
                let reader = {
                    let service = service.clone();
                    let id = seeded_id.clone();
                    std::thread::spawn(move || {
                        for _ in 0..1_000 {
                            assert!(service.store().get_content(&id).is_ok());
                        }
                    })
                };
                let writer = {
                    let service = service.clone();
                    std::thread::spawn(move || {
                        for _ in 0..1_000 {
                            let created = service
                                .create_sms(
                                    &template.id,
                                    CreateSmsRequest {
                                        locale: "en-US".to_string(),
                                        content: "Hi".to_string(),
                                    },
                                )
                                .unwrap();
                            service.delete_sms(&created.id).unwrap();
                        }
                    })
                };
                [reader, writer]
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_renderer_over_store_directly() {
        let store = create_store();
        let t = store
            .create_template(Template::from(CreateTemplateRequest {
                name: "draft".to_string(),
                variables: BTreeMap::new(),
            }))
            .unwrap();

        let outcome = Renderer::new(store.as_ref()).render_sms(
            &t,
            "{who} [if who]set[fi]",
            "en-US",
            &bindings(json!({"who": null})),
        );
        assert_eq!(outcome.output, " ");
    }
}

// =============================================================================
// Validation
// =============================================================================

mod validation_tests {
    use super::*;

    #[test]
    fn test_validate_example() {
        let store = create_store();
        let declared = BTreeMap::from([("name".to_string(), VariableType::Any)]);
        let content = BTreeMap::from([(
            "content".to_string(),
            "Hi {name} {extra} #nope#".to_string(),
        )]);

        let mut violations = validate(store.as_ref(), &content, &["content"], &declared);
        violations.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            violations,
            vec![
                Violation::new(ViolationKind::Variable, "extra"),
                Violation::new(ViolationKind::Template, "nope"),
            ]
        );
    }

    #[test]
    fn test_service_rejects_then_accepts() {
        let service = create_service();
        let t = add_template(&service, "welcome", &[("name", VariableType::String)]);

        let rejected = service.create_sms(
            &t.id,
            CreateSmsRequest {
                locale: "en-US".to_string(),
                content: "Hi {name} #footer#".to_string(),
            },
        );
        assert!(matches!(rejected, Err(TemplateError::ContentInvalid(_))));

        let footer = add_template(&service, "footer", &[]);
        add_raw_sms(&service, &footer, "Bye");

        let accepted = service.create_sms(
            &t.id,
            CreateSmsRequest {
                locale: "en-US".to_string(),
                content: "Hi {name} #footer#".to_string(),
            },
        );
        assert!(accepted.is_ok());
    }
}
