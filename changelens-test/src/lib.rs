// Integration test utilities and change-set fixtures for changelens.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use changelens_core::ChangeSet;
use similar::TextDiff;

/// Before/after contents of a small PHP project. Paths present on only one
/// side are additions or deletions; identical paths are context.
#[derive(Debug, Clone, Default)]
pub struct ChangeFixture {
    before: BTreeMap<PathBuf, String>,
    after: BTreeMap<PathBuf, String>,
}

impl ChangeFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modified(mut self, path: &str, before: &str, after: &str) -> Self {
        self.before.insert(PathBuf::from(path), before.to_string());
        self.after.insert(PathBuf::from(path), after.to_string());
        self
    }

    pub fn added(mut self, path: &str, after: &str) -> Self {
        self.after.insert(PathBuf::from(path), after.to_string());
        self
    }

    pub fn deleted(mut self, path: &str, before: &str) -> Self {
        self.before.insert(PathBuf::from(path), before.to_string());
        self
    }

    /// An untouched file, identical on both sides.
    pub fn context(self, path: &str, content: &str) -> Self {
        self.modified(path, content, content)
    }

    /// Git-style unified diff over every path whose content differs.
    pub fn diff(&self) -> String {
        let paths: BTreeSet<&PathBuf> = self.before.keys().chain(self.after.keys()).collect();
        paths
            .into_iter()
            .map(|path| {
                unified_diff(
                    path,
                    self.before.get(path).map(String::as_str),
                    self.after.get(path).map(String::as_str),
                )
            })
            .collect()
    }

    /// Every file on both sides, context files included.
    pub fn change_set(&self) -> ChangeSet {
        ChangeSet {
            diff: self.diff(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }

    /// Only the files the diff touches, without context files.
    pub fn touched_only(&self) -> ChangeSet {
        let mut changes = self.change_set();
        changes
            .before
            .retain(|path, content| self.after.get(path) != Some(content));
        changes
            .after
            .retain(|path, content| self.before.get(path) != Some(content));
        changes
    }

    /// Write `before/`, `after/` and `change.diff` under `root`.
    pub fn write_to(&self, root: &Path) -> FixtureDirs {
        let dirs = FixtureDirs {
            before: root.join("before"),
            after: root.join("after"),
            diff: root.join("change.diff"),
        };
        write_tree(&dirs.before, &self.before);
        write_tree(&dirs.after, &self.after);
        std::fs::write(&dirs.diff, self.diff()).expect("write diff");
        dirs
    }
}

#[derive(Debug, Clone)]
pub struct FixtureDirs {
    pub before: PathBuf,
    pub after: PathBuf,
    pub diff: PathBuf,
}

fn write_tree(root: &Path, files: &BTreeMap<PathBuf, String>) {
    std::fs::create_dir_all(root).expect("create snapshot dir");
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(full, content).expect("write snapshot file");
    }
}

/// One file section of a git diff. Empty when both sides are equal.
pub fn unified_diff(path: &Path, before: Option<&str>, after: Option<&str>) -> String {
    if before == after {
        return String::new();
    }
    let name = path.display();
    let mut out = format!("diff --git a/{name} b/{name}\n");
    let (old_header, new_header) = match (before, after) {
        (None, _) => {
            out.push_str("new file mode 100644\n");
            ("/dev/null".to_string(), format!("b/{name}"))
        }
        (_, None) => {
            out.push_str("deleted file mode 100644\n");
            (format!("a/{name}"), "/dev/null".to_string())
        }
        _ => (format!("a/{name}"), format!("b/{name}")),
    };
    let old = before.unwrap_or("");
    let new = after.unwrap_or("");
    let diff = TextDiff::from_lines(old, new);
    out.push_str(
        &diff
            .unified_diff()
            .context_radius(3)
            .header(&old_header, &new_header)
            .to_string(),
    );
    out
}

// ── PHP fixtures ─────────────────────────────────────────────────

pub const WIDGET_INTERFACE: &str = r"<?php

namespace Pyz\Zed\Widget\Business;

interface FooInterface
{
    /**
     * Returns a widget.
     *
     * @api
     *
     * @return string
     */
    public function bar(): string;
}
";

pub const WIDGET_BEFORE: &str = r"<?php

namespace Pyz\Zed\Widget\Business;

class Foo implements FooInterface
{
    protected function helper(): int
    {
        return 1;
    }
}
";

pub const WIDGET_AFTER: &str = r"<?php

namespace Pyz\Zed\Widget\Business;

class Foo implements FooInterface
{
    public function bar(): string
    {
        return 'widget';
    }

    protected function helper(): int
    {
        return 1;
    }
}
";

/// A class gains an undocumented method whose docs live on its interface.
pub fn widget_fixture() -> ChangeFixture {
    ChangeFixture::new()
        .modified("src/Pyz/Zed/Widget/Business/Foo.php", WIDGET_BEFORE, WIDGET_AFTER)
        .context("src/Pyz/Zed/Widget/Business/FooInterface.php", WIDGET_INTERFACE)
}

pub const CART_CONFIG_BEFORE: &str = r"<?php

namespace Pyz\Zed\Cart;

use Spryker\Zed\Kernel\AbstractBundleConfig;

class CartConfig extends AbstractBundleConfig
{
    /**
     * @api
     *
     * @return int
     */
    public function getMaxItems(): int
    {
        return 10;
    }

    /**
     * @api
     *
     * @return string
     */
    public function getDefaultCurrency(): string
    {
        return 'EUR';
    }

    /**
     * @api
     *
     * @return bool
     */
    public function isPersistent(): bool
    {
        return false;
    }
}
";

pub const CART_CONFIG_AFTER: &str = r"<?php

namespace Pyz\Zed\Cart;

use Spryker\Zed\Kernel\AbstractBundleConfig;

class CartConfig extends AbstractBundleConfig
{
    /**
     * @api
     *
     * @return int
     */
    public function getMaxItems(): int
    {
        return 25;
    }

    /**
     * @api
     *
     * @return string
     */
    public function getDefaultCurrency(): string
    {
        return 'USD';
    }

    /**
     * @api
     *
     * @return bool
     */
    public function isPersistent(): bool
    {
        return true;
    }
}
";

/// Three configuration methods change their bodies only.
pub fn cart_config_fixture() -> ChangeFixture {
    ChangeFixture::new().modified(
        "src/Pyz/Zed/Cart/CartConfig.php",
        CART_CONFIG_BEFORE,
        CART_CONFIG_AFTER,
    )
}

pub const QUOTE_TRANSFER_BEFORE: &str = r#"<?xml version="1.0"?>
<transfers xmlns="spryker:transfer-01"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xsi:schemaLocation="spryker:transfer-01 http://static.spryker.com/transfer-01.xsd">

    <transfer name="Quote">
        <property name="items" type="Item[]" singular="item"/>
        <property name="customer" type="Customer"/>
    </transfer>

</transfers>
"#;

pub const QUOTE_TRANSFER_AFTER: &str = r#"<?xml version="1.0"?>
<transfers xmlns="spryker:transfer-01"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xsi:schemaLocation="spryker:transfer-01 http://static.spryker.com/transfer-01.xsd">

    <transfer name="Quote">
        <property name="items" type="Item[]" singular="item"/>
        <property name="store" type="Store"/>
    </transfer>

</transfers>
"#;

/// A transfer gains one property and loses another.
pub fn quote_transfer_fixture() -> ChangeFixture {
    ChangeFixture::new().modified(
        "src/Pyz/Shared/Cart/Transfer/cart.transfer.xml",
        QUOTE_TRANSFER_BEFORE,
        QUOTE_TRANSFER_AFTER,
    )
}

pub const CART_FACADE: &str = r"<?php

namespace Pyz\Zed\Cart\Business;

use Spryker\Zed\Kernel\Business\AbstractFacade;

/**
 * @method \Pyz\Zed\Cart\Business\CartBusinessFactory getFactory()
 */
class CartFacade extends AbstractFacade
{
    public function readCart(int $idCart): array
    {
        return $this->getFactory()->createCartReader()->read($idCart);
    }
}
";

pub const CART_BUSINESS_FACTORY: &str = r"<?php

namespace Pyz\Zed\Cart\Business;

use Pyz\Zed\Cart\Business\Reader\CartReader;
use Pyz\Zed\Cart\Business\Reader\CartReaderInterface;
use Spryker\Zed\Kernel\Business\AbstractBusinessFactory;

class CartBusinessFactory extends AbstractBusinessFactory
{
    public function createCartReader(): CartReaderInterface
    {
        return new CartReader();
    }
}
";

pub const CART_READER_INTERFACE: &str = r"<?php

namespace Pyz\Zed\Cart\Business\Reader;

interface CartReaderInterface
{
    public function read(int $idCart): array;
}
";

pub const CART_READER_BEFORE: &str = r"<?php

namespace Pyz\Zed\Cart\Business\Reader;

class CartReader implements CartReaderInterface
{
    public function read(int $idCart): array
    {
        return $this->loadItems($idCart);
    }

    protected function loadItems(int $idCart): array
    {
        return [];
    }
}
";

pub const CART_READER_AFTER: &str = r"<?php

namespace Pyz\Zed\Cart\Business\Reader;

class CartReader implements CartReaderInterface
{
    public function read(int $idCart): array
    {
        return $this->loadItems($idCart);
    }

    protected function loadItems(int $idCart, bool $withTotals = false): array
    {
        return [];
    }
}
";

pub const CART_READER_PATH: &str = "src/Pyz/Zed/Cart/Business/Reader/CartReader.php";

/// A protected model method changes its signature. The facade reaches it
/// through the factory and the model's interface, both given as context.
pub fn cart_reader_fixture() -> ChangeFixture {
    ChangeFixture::new()
        .modified(CART_READER_PATH, CART_READER_BEFORE, CART_READER_AFTER)
        .context("src/Pyz/Zed/Cart/Business/CartFacade.php", CART_FACADE)
        .context("src/Pyz/Zed/Cart/Business/CartBusinessFactory.php", CART_BUSINESS_FACTORY)
        .context(
            "src/Pyz/Zed/Cart/Business/Reader/CartReaderInterface.php",
            CART_READER_INTERFACE,
        )
}

/// `composer.json` with the given `require` entries.
pub fn composer_manifest(require: &[(&str, &str)]) -> String {
    let entries: Vec<String> = require
        .iter()
        .map(|(name, constraint)| format!("        \"{name}\": \"{constraint}\""))
        .collect();
    format!(
        "{{\n    \"name\": \"pyz/cart\",\n    \"require\": {{\n{}\n    }}\n}}\n",
        entries.join(",\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_has_git_headers() {
        let diff = widget_fixture().diff();
        assert!(diff.starts_with(
            "diff --git a/src/Pyz/Zed/Widget/Business/Foo.php b/src/Pyz/Zed/Widget/Business/Foo.php\n"
        ));
        assert!(diff.contains("--- a/src/Pyz/Zed/Widget/Business/Foo.php\n"));
        assert!(diff.contains("+    public function bar(): string\n"));
        assert!(!diff.contains("FooInterface.php"));
    }

    #[test]
    fn added_file_diff() {
        let diff = unified_diff(Path::new("src/New.php"), None, Some("<?php\nclass NewOne {}\n"));
        assert!(diff.contains("new file mode 100644\n"));
        assert!(diff.contains("--- /dev/null\n+++ b/src/New.php\n"));
        assert!(diff.contains("@@ -0,0 +1,2 @@"));
    }

    #[test]
    fn touched_only_drops_context() {
        let changes = widget_fixture().touched_only();
        assert_eq!(changes.before.len(), 1);
        assert_eq!(changes.after.len(), 1);
    }
}
