//! Shared test support utilities for gherkin-autocomplete-server integration
//! tests.
//!
//! This module re-exports utilities from the crate's `test_support` module,
//! providing a single source of truth for test infrastructure.

#![allow(
    unused_imports,
    dead_code,
    reason = "each test binary uses a different subset of helpers"
)]

pub use gherkin_autocomplete_server::test_support::{TestWorkspace, WorkspaceBuilder};

/// A basket feature shared by several tests.
pub const BASKET_FEATURE: &str = concat!(
    "Feature: Basket\n",
    "  Scenario: Adding items\n",
    "    Given I have 3 items in my basket\n",
    "    When I add \"apples\" to the basket\n",
    "    Then the basket holds 4 items\n",
);

/// A feature exporting its scenarios for reuse.
pub const EXPORTED_FEATURE: &str = concat!(
    "@ExportScenarios\n",
    "Feature: Shared steps\n",
    "  Scenario: I log in as admin\n",
    "    Given I open the login page\n",
    "    When I enter \"admin\" credentials\n",
);

/// A BSL step module registering one exported step.
pub const BSL_MODULE: &str = concat!(
    "&НаКлиенте\n",
    "Функция ПолучитьСписокТестов(КонтекстФреймворкаBDD) Экспорт\n",
    "\tВсеТесты = Новый Массив;\n",
    "\tВанесса.ДобавитьШагВМассивТестов(ВсеТесты,\"ЯОткрываюФорму(Парам01)\",\"ЯОткрываюФорму\",\"Когда я открываю форму <Парам01>\",\"\",\"\");\n",
    "\tВозврат ВсеТесты;\n",
    "КонецФункции\n",
    "\n",
    "// Открывает форму по имени.\n",
    "&НаКлиенте\n",
    "Процедура ЯОткрываюФорму(Парам01) Экспорт\n",
    "КонецПроцедуры\n",
);

/// Default workspace with the basket feature, the exported feature and a
/// BSL step module.
pub fn basket_workspace() -> WorkspaceBuilder {
    WorkspaceBuilder::new()
        .with_feature("basket.feature", BASKET_FEATURE)
        .with_feature("shared/login.feature", EXPORTED_FEATURE)
        .with_file("features/steps/forms.bsl", BSL_MODULE)
}
