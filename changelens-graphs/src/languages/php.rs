use std::collections::HashMap;
use std::path::Path;

use tree_sitter::Node;

use crate::docblock::{self, DocBlock};
use crate::names::AliasTable;
use crate::{
    CallReceiver, CallSite, ConstDecl, FileDeclarations, MethodDecl, ParamDecl, PropertyDecl,
    Result, TypeDecl, TypeKind, UnnamedDecl, Visibility,
};

use super::LanguageSupport;
use super::helpers::{
    child_by_field, extract_block_doc_comment, find_child_by_kind, hash_normalized, node_range,
    node_text, squash_whitespace,
};

#[derive(Debug)]
pub struct PhpSupport;

impl LanguageSupport for PhpSupport {
    fn id(&self) -> &'static str {
        "php"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["php"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_php::LANGUAGE_PHP.into()
    }

    fn extract_declarations(
        &self,
        tree: &tree_sitter::Tree,
        source: &str,
        path: &Path,
    ) -> Result<FileDeclarations> {
        let mut out = FileDeclarations {
            file_path: path.to_path_buf(),
            types: Vec::new(),
            unnamed: Vec::new(),
            has_syntax_errors: tree.root_node().has_error(),
        };
        let mut scope = Scope::default();

        walk_statements(tree.root_node(), source, &mut scope, &mut out);

        tracing::trace!(
            path = %path.display(),
            types = out.types.len(),
            errors = out.has_syntax_errors,
            "Extracted PHP declarations"
        );
        Ok(out)
    }
}

/// Name-resolution state at a point in the file. Unbraced `namespace X;`
/// statements replace it for every following sibling.
#[derive(Debug, Default)]
struct Scope {
    namespace: String,
    aliases: AliasTable,
}

fn walk_statements(parent: Node<'_>, source: &str, scope: &mut Scope, out: &mut FileDeclarations) {
    let mut cursor = parent.walk();
    for child in parent.named_children(&mut cursor) {
        match child.kind() {
            "namespace_definition" => {
                let name = child_by_field(child, "name")
                    .map(|n| node_text(n, source).trim().to_string())
                    .unwrap_or_default();
                if let Some(body) = child_by_field(child, "body") {
                    let mut inner = Scope {
                        namespace: name,
                        aliases: AliasTable::new(),
                    };
                    walk_statements(body, source, &mut inner, out);
                } else {
                    scope.namespace = name;
                    scope.aliases = AliasTable::new();
                }
            }
            "namespace_use_declaration" => {
                scope.aliases.add_use_statement(node_text(child, source));
            }
            "class_declaration" => extract_type(child, TypeKind::Class, source, scope, out),
            "interface_declaration" => {
                extract_type(child, TypeKind::Interface, source, scope, out);
            }
            _ => {}
        }
    }
}

fn extract_type(
    node: Node<'_>,
    kind: TypeKind,
    source: &str,
    scope: &Scope,
    out: &mut FileDeclarations,
) {
    let name = child_by_field(node, "name")
        .map(|n| node_text(n, source).trim())
        .filter(|n| !n.is_empty());
    let Some(name) = name else {
        out.unnamed.push(UnnamedDecl {
            node_kind: node.kind().to_string(),
            span: node_range(node),
        });
        return;
    };

    // Classes list contracts in `implements`, interfaces in `extends`.
    let clause_kind = match kind {
        TypeKind::Class => "class_interface_clause",
        TypeKind::Interface => "base_clause",
    };
    let interfaces = find_child_by_kind(node, clause_kind)
        .map(|clause| type_names(clause, source))
        .unwrap_or_default();

    let mut methods = Vec::new();
    let mut constants = Vec::new();
    let mut properties = Vec::new();
    let mut constructor = None;
    if let Some(body) = child_by_field(node, "body") {
        let mut cursor = body.walk();
        for member in body.named_children(&mut cursor) {
            match member.kind() {
                "method_declaration" => match extract_method(member, kind, source) {
                    Some(method) => {
                        if method.name.eq_ignore_ascii_case("__construct") {
                            constructor = Some(member);
                        }
                        methods.push(method);
                    }
                    None => out.unnamed.push(UnnamedDecl {
                        node_kind: member.kind().to_string(),
                        span: node_range(member),
                    }),
                },
                "const_declaration" => constants.extend(extract_constants(member, source)),
                "property_declaration" => {
                    for property in extract_properties(member, source) {
                        add_property(&mut properties, property);
                    }
                }
                _ => {}
            }
        }
    }
    if let Some(constructor) = constructor {
        for property in constructor_properties(constructor, source) {
            add_property(&mut properties, property);
        }
    }

    out.types.push(TypeDecl {
        name: name.to_string(),
        kind,
        namespace: scope.namespace.clone(),
        aliases: scope.aliases.clone(),
        interfaces,
        doc: extract_block_doc_comment(node, source),
        methods,
        constants,
        properties,
        span: node_range(node),
    });
}

fn type_names(clause: Node<'_>, source: &str) -> Vec<String> {
    let mut cursor = clause.walk();
    clause
        .named_children(&mut cursor)
        .filter(|c| matches!(c.kind(), "name" | "qualified_name"))
        .map(|c| node_text(c, source).trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn extract_method(node: Node<'_>, owner_kind: TypeKind, source: &str) -> Option<MethodDecl> {
    let name = child_by_field(node, "name")
        .map(|n| node_text(n, source).trim())
        .filter(|n| !n.is_empty())?;

    let visibility = find_child_by_kind(node, "visibility_modifier")
        .and_then(|v| Visibility::parse(node_text(v, source)))
        .unwrap_or_default();
    let body = child_by_field(node, "body");

    let params = child_by_field(node, "parameters")
        .map(|list| {
            let mut cursor = list.walk();
            list.named_children(&mut cursor)
                .filter_map(|p| extract_param(p, source))
                .collect()
        })
        .unwrap_or_default();

    let param_types = parameter_types(node, source);
    let calls = body
        .map(|b| extract_calls(b, source, &param_types))
        .unwrap_or_default();

    Some(MethodDecl {
        name: name.to_string(),
        visibility,
        is_static: find_child_by_kind(node, "static_modifier").is_some(),
        is_abstract: owner_kind == TypeKind::Interface
            || body.is_none()
            || find_child_by_kind(node, "abstract_modifier").is_some(),
        params,
        return_type: child_by_field(node, "return_type")
            .map(|t| squash_whitespace(node_text(t, source))),
        doc: extract_block_doc_comment(node, source),
        body_hash: body.map(|b| hash_normalized(node_text(b, source))),
        calls,
        span: node_range(node),
    })
}

fn extract_param(node: Node<'_>, source: &str) -> Option<ParamDecl> {
    let variadic = match node.kind() {
        "simple_parameter" | "property_promotion_parameter" => false,
        "variadic_parameter" => true,
        _ => return None,
    };
    let name = child_by_field(node, "name").map(|n| node_text(n, source).trim().to_string())?;

    Some(ParamDecl {
        name,
        type_hint: child_by_field(node, "type").map(|t| squash_whitespace(node_text(t, source))),
        default: child_by_field(node, "default_value")
            .map(|d| squash_whitespace(node_text(d, source))),
        variadic,
        by_ref: find_child_by_kind(node, "reference_modifier").is_some(),
    })
}

// ── Constants and properties ──

fn extract_constants(node: Node<'_>, source: &str) -> Vec<ConstDecl> {
    let visibility = find_child_by_kind(node, "visibility_modifier")
        .and_then(|v| Visibility::parse(node_text(v, source)))
        .unwrap_or_default();

    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() == "const_element")
        .filter_map(|element| {
            let mut inner = element.walk();
            let parts: Vec<Node<'_>> = element.named_children(&mut inner).collect();
            let name = parts.iter().find(|p| p.kind() == "name")?;
            let value = parts.iter().rev().find(|p| p.id() != name.id())?;
            Some(ConstDecl {
                name: node_text(*name, source).trim().to_string(),
                visibility,
                value: squash_whitespace(node_text(*value, source)),
                span: node_range(element),
            })
        })
        .collect()
}

/// The class member of a type expression (`?Foo`, `Foo|null` → `Foo`).
fn class_type(text: &str) -> Option<String> {
    let text = squash_whitespace(text);
    docblock::first_class_type(&text).map(str::to_string)
}

fn extract_properties(node: Node<'_>, source: &str) -> Vec<PropertyDecl> {
    let declared = child_by_field(node, "type").and_then(|t| class_type(node_text(t, source)));
    let from_doc = || {
        let doc = extract_block_doc_comment(node, source)?;
        let block = DocBlock::parse(&doc.text);
        let value = block.tag_values("var").next()?;
        class_type(value.split_whitespace().next()?)
    };
    let Some(type_name) = declared.or_else(from_doc) else {
        return Vec::new();
    };

    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() == "property_element")
        .filter_map(|element| child_by_field(element, "name"))
        .map(|name| PropertyDecl {
            name: variable_name(node_text(name, source)).to_string(),
            type_name: type_name.clone(),
        })
        .collect()
}

/// Promoted parameters and `$this->x = $typedParam;` assignments.
fn constructor_properties(node: Node<'_>, source: &str) -> Vec<PropertyDecl> {
    let mut found = Vec::new();
    if let Some(list) = child_by_field(node, "parameters") {
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            if param.kind() != "property_promotion_parameter" {
                continue;
            }
            let name = child_by_field(param, "name").map(|n| node_text(n, source));
            let type_name = child_by_field(param, "type").and_then(|t| class_type(node_text(t, source)));
            if let (Some(name), Some(type_name)) = (name, type_name) {
                found.push(PropertyDecl {
                    name: variable_name(name).to_string(),
                    type_name,
                });
            }
        }
    }

    let Some(body) = child_by_field(node, "body") else {
        return found;
    };
    let param_types = parameter_types(node, source);
    visit_descendants(body, &mut |n| {
        if n.kind() != "assignment_expression" {
            return;
        }
        let (Some(left), Some(right)) = (child_by_field(n, "left"), child_by_field(n, "right")) else {
            return;
        };
        if right.kind() != "variable_name" {
            return;
        }
        let Some(property) = this_property(left, source) else {
            return;
        };
        if let Some(type_name) = param_types.get(node_text(right, source).trim()) {
            found.push(PropertyDecl {
                name: property,
                type_name: type_name.clone(),
            });
        }
    });
    found
}

/// First declaration of a property name wins.
fn add_property(properties: &mut Vec<PropertyDecl>, property: PropertyDecl) {
    if !properties.iter().any(|p| p.name == property.name) {
        properties.push(property);
    }
}

/// `$name` or `&$name` → `name`.
fn variable_name(text: &str) -> &str {
    text.trim().trim_start_matches('&').trim_start_matches('$')
}

// ── Call sites ──

/// Parameter variables (`$quote`) with a class type hint.
fn parameter_types(node: Node<'_>, source: &str) -> HashMap<String, String> {
    let Some(list) = child_by_field(node, "parameters") else {
        return HashMap::new();
    };
    let mut cursor = list.walk();
    list.named_children(&mut cursor)
        .filter_map(|param| {
            let name = child_by_field(param, "name")?;
            let type_name = class_type(node_text(child_by_field(param, "type")?, source))?;
            Some((format!("${}", variable_name(node_text(name, source))), type_name))
        })
        .collect()
}

fn visit_descendants<'t>(node: Node<'t>, visit: &mut impl FnMut(Node<'t>)) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(child);
        visit_descendants(child, visit);
    }
}

fn extract_calls(body: Node<'_>, source: &str, param_types: &HashMap<String, String>) -> Vec<CallSite> {
    let mut calls: Vec<CallSite> = Vec::new();
    visit_descendants(body, &mut |n| {
        let site = match n.kind() {
            "member_call_expression" | "nullsafe_member_call_expression" => {
                member_call(n, source, param_types)
            }
            "scoped_call_expression" => scoped_call(n, source),
            _ => None,
        };
        if let Some(site) = site {
            if !calls.contains(&site) {
                calls.push(site);
            }
        }
    });
    calls
}

fn is_member_call(node: Node<'_>) -> bool {
    matches!(node.kind(), "member_call_expression" | "nullsafe_member_call_expression")
}

fn is_this(node: Node<'_>, source: &str) -> bool {
    node.kind() == "variable_name" && node_text(node, source).trim() == "$this"
}

/// Static method name of a call; dynamic names (`$this->$m()`) give `None`.
fn call_name(node: Node<'_>, source: &str) -> Option<String> {
    child_by_field(node, "name")
        .filter(|n| n.kind() == "name")
        .map(|n| node_text(n, source).trim().to_string())
}

/// `$this->name` → `name`.
fn this_property(node: Node<'_>, source: &str) -> Option<String> {
    if !matches!(node.kind(), "member_access_expression" | "nullsafe_member_access_expression") {
        return None;
    }
    if !is_this(child_by_field(node, "object")?, source) {
        return None;
    }
    child_by_field(node, "name")
        .filter(|n| n.kind() == "name")
        .map(|n| node_text(n, source).trim().to_string())
}

fn member_call(node: Node<'_>, source: &str, param_types: &HashMap<String, String>) -> Option<CallSite> {
    let method = call_name(node, source)?;
    let object = child_by_field(node, "object")?;

    let receiver = if is_this(object, source) {
        CallReceiver::This
    } else if object.kind() == "variable_name" {
        CallReceiver::Typed(param_types.get(node_text(object, source).trim())?.clone())
    } else if let Some(property) = this_property(object, source) {
        CallReceiver::Property(property)
    } else if is_member_call(object) {
        let inner_name = call_name(object, source)?;
        let inner_object = child_by_field(object, "object")?;
        if is_this(inner_object, source) {
            CallReceiver::Accessor(inner_name)
        } else if is_member_call(inner_object)
            && is_this(child_by_field(inner_object, "object")?, source)
        {
            CallReceiver::FactoryProduct {
                accessor: call_name(inner_object, source)?,
                factory_method: inner_name,
            }
        } else {
            return None;
        }
    } else {
        return None;
    };
    Some(CallSite { receiver, method })
}

fn scoped_call(node: Node<'_>, source: &str) -> Option<CallSite> {
    let scope = child_by_field(node, "scope")?;
    if !matches!(scope.kind(), "relative_scope" | "name" | "qualified_name") {
        return None;
    }
    Some(CallSite {
        receiver: CallReceiver::Scoped(node_text(scope, source).trim().to_string()),
        method: call_name(node, source)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(source: &str) -> FileDeclarations {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .unwrap();
        let tree = parser.parse(source, None).unwrap();
        PhpSupport
            .extract_declarations(&tree, source, Path::new("CartFacade.php"))
            .unwrap()
    }

    const FACADE: &str = r#"<?php

namespace Pyz\Zed\Cart\Business;

use Generated\Shared\Transfer\QuoteTransfer;
use Spryker\Zed\Kernel\Business\AbstractFacade;

/**
 * @method \Pyz\Zed\Cart\Business\CartBusinessFactory getFactory()
 */
class CartFacade extends AbstractFacade implements CartFacadeInterface, \Countable
{
    /**
     * {@inheritDoc}
     *
     * @api
     */
    public function reloadItems(QuoteTransfer $quoteTransfer, array &$options = [], string ...$skus): QuoteTransfer
    {
        return $this->getFactory()
            ->createCartReloader()
            ->reload($quoteTransfer);
    }

    protected static function helper()
    {
    }

    private function secret(): void {}
}
"#;

    #[test]
    fn extracts_class_with_context() {
        let decls = extract(FACADE);
        assert!(!decls.has_syntax_errors);
        assert_eq!(decls.types.len(), 1);

        let class = &decls.types[0];
        assert_eq!(class.name, "CartFacade");
        assert_eq!(class.kind, TypeKind::Class);
        assert_eq!(class.namespace, "Pyz\\Zed\\Cart\\Business");
        assert_eq!(class.interfaces, vec!["CartFacadeInterface", "\\Countable"]);
        assert_eq!(class.aliases.get("QuoteTransfer"), Some("Generated\\Shared\\Transfer\\QuoteTransfer"));
        assert!(class.doc.as_ref().unwrap().text.contains("getFactory()"));
        assert_eq!(class.methods.len(), 3);
    }

    #[test]
    fn extracts_method_signatures() {
        let decls = extract(FACADE);
        let methods = &decls.types[0].methods;

        let reload = &methods[0];
        assert_eq!(reload.name, "reloadItems");
        assert_eq!(reload.visibility, Visibility::Public);
        assert!(!reload.is_static);
        assert!(!reload.is_abstract);
        assert_eq!(reload.return_type.as_deref(), Some("QuoteTransfer"));
        assert!(reload.doc.as_ref().unwrap().text.starts_with("{@inheritDoc}"));
        assert!(reload.body_hash.is_some());

        assert_eq!(reload.params.len(), 3);
        assert_eq!(reload.params[0].name, "$quoteTransfer");
        assert_eq!(reload.params[0].type_hint.as_deref(), Some("QuoteTransfer"));
        assert!(reload.params[1].by_ref);
        assert_eq!(reload.params[1].default.as_deref(), Some("[]"));
        assert!(reload.params[2].variadic);

        let helper = &methods[1];
        assert_eq!(helper.visibility, Visibility::Protected);
        assert!(helper.is_static);
        assert!(helper.doc.is_none());
        assert!(helper.return_type.is_none());

        assert_eq!(methods[2].visibility, Visibility::Private);
    }

    #[test]
    fn body_reformatting_keeps_hash() {
        let a = extract("<?php class A { public function f() { return 1; } }");
        let b = extract("<?php class A {\n  public function f()\n  {\n      return 1;\n  }\n}");
        let c = extract("<?php class A { public function f() { return 2; } }");
        let hash = |d: &FileDeclarations| d.types[0].methods[0].body_hash;
        assert_eq!(hash(&a), hash(&b));
        assert_ne!(hash(&a), hash(&c));
    }

    #[test]
    fn interface_extends_and_abstract_methods() {
        let decls = extract(
            "<?php\nnamespace Pyz\\Zed\\Cart\\Business;\n\ninterface CartFacadeInterface extends BaseInterface, \\Other\\Contract\n{\n    /**\n     * Reloads all items.\n     *\n     * @return \\Generated\\Shared\\Transfer\\QuoteTransfer\n     */\n    public function reloadItems($quote);\n}\n",
        );
        let iface = &decls.types[0];
        assert_eq!(iface.kind, TypeKind::Interface);
        assert_eq!(iface.interfaces, vec!["BaseInterface", "\\Other\\Contract"]);
        let method = &iface.methods[0];
        assert!(method.is_abstract);
        assert!(method.body_hash.is_none());
        assert_eq!(method.params[0].type_hint, None);
    }

    #[test]
    fn braced_namespaces_scope_aliases() {
        let decls = extract(
            "<?php\nnamespace A {\n    use X\\Y as Z;\n    class One implements Z {}\n}\nnamespace B {\n    class Two {}\n}\n",
        );
        assert_eq!(decls.types.len(), 2);
        assert_eq!(decls.types[0].namespace, "A");
        assert_eq!(decls.types[0].aliases.get("Z"), Some("X\\Y"));
        assert_eq!(decls.types[1].namespace, "B");
        assert!(decls.types[1].aliases.is_empty());
    }

    #[test]
    fn unbraced_namespace_resets_aliases() {
        let decls = extract(
            "<?php\nnamespace A;\nuse X\\Y;\nclass One {}\nnamespace B;\nclass Two {}\n",
        );
        assert_eq!(decls.types[0].namespace, "A");
        assert!(decls.types[0].aliases.get("Y").is_some());
        assert_eq!(decls.types[1].namespace, "B");
        assert!(decls.types[1].aliases.is_empty());
    }

    #[test]
    fn syntax_errors_are_flagged() {
        let decls = extract("<?php\nclass Broken {\n    public function f( {\n}\n");
        assert!(decls.has_syntax_errors);
    }

    #[test]
    fn factory_chain_calls() {
        let decls = extract(FACADE);
        let calls = &decls.types[0].methods[0].calls;
        assert_eq!(
            calls,
            &vec![
                CallSite {
                    receiver: CallReceiver::FactoryProduct {
                        accessor: "getFactory".to_string(),
                        factory_method: "createCartReloader".to_string(),
                    },
                    method: "reload".to_string(),
                },
                CallSite {
                    receiver: CallReceiver::Accessor("getFactory".to_string()),
                    method: "createCartReloader".to_string(),
                },
                CallSite {
                    receiver: CallReceiver::This,
                    method: "getFactory".to_string(),
                },
            ]
        );
    }

    #[test]
    fn receiver_kinds() {
        let decls = extract(
            r#"<?php
class CartReloader
{
    protected CartValidator $validator;

    public function reload(QuoteTransfer $quote, $untyped)
    {
        $this->validator->validate($quote);
        $this->validator->validate($quote);
        $quote?->getItems();
        $untyped->ignored();
        self::normalize($quote);
        Util\Str::trim('x');
        $this->$dynamic();
        return $this->finish();
    }
}
"#,
        );
        let receivers: Vec<(CallReceiver, &str)> = decls.types[0].methods[0]
            .calls
            .iter()
            .map(|c| (c.receiver.clone(), c.method.as_str()))
            .collect();
        assert_eq!(
            receivers,
            vec![
                (CallReceiver::Property("validator".to_string()), "validate"),
                (CallReceiver::Typed("QuoteTransfer".to_string()), "getItems"),
                (CallReceiver::Scoped("self".to_string()), "normalize"),
                (CallReceiver::Scoped("Util\\Str".to_string()), "trim"),
                (CallReceiver::This, "finish"),
            ]
        );
    }

    #[test]
    fn typed_properties_from_every_source() {
        let decls = extract(
            r#"<?php
class CartModel
{
    /**
     * @var \Pyz\Zed\Cart\Business\Reader|null
     */
    protected $reader;

    private ?Writer $writer = null;

    protected int $count = 0;

    public function __construct(protected Validator $validator, Repository $repository, $plain)
    {
        $this->repository = $repository;
        $this->plain = $plain;
        $this->writer = $repository;
    }
}
"#,
        );
        let properties: Vec<(&str, &str)> = decls.types[0]
            .properties
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str()))
            .collect();
        assert_eq!(
            properties,
            vec![
                ("reader", "\\Pyz\\Zed\\Cart\\Business\\Reader"),
                ("writer", "Writer"),
                ("validator", "Validator"),
                ("repository", "Repository"),
            ]
        );
    }

    #[test]
    fn class_constants() {
        let decls = extract(
            "<?php\nclass CartConstants\n{\n    public const MAX_ITEMS = 10;\n    protected const MODES = [\n        'a',\n        'b',\n    ], OTHER = self::MAX_ITEMS;\n    const PLAIN = 'x';\n}\n",
        );
        let constants: Vec<(&str, Visibility, &str)> = decls.types[0]
            .constants
            .iter()
            .map(|c| (c.name.as_str(), c.visibility, c.value.as_str()))
            .collect();
        assert_eq!(
            constants,
            vec![
                ("MAX_ITEMS", Visibility::Public, "10"),
                ("MODES", Visibility::Protected, "[ 'a', 'b', ]"),
                ("OTHER", Visibility::Protected, "self::MAX_ITEMS"),
                ("PLAIN", Visibility::Public, "'x'"),
            ]
        );
    }

    #[test]
    fn global_namespace_is_empty() {
        let decls = extract("<?php\nclass Plain {}\n");
        assert_eq!(decls.types[0].namespace, "");
        assert!(decls.types[0].methods.is_empty());
        assert!(decls.unnamed.is_empty());
    }
}
