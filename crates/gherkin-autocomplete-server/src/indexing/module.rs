//! Step-definition discovery in BSL and OneScript modules.
//!
//! A module exposes steps by exporting a well-known list method whose body
//! registers each step method by name. Extraction reads the module's method
//! table, scans the source for registrations, and keeps the exported methods
//! that were registered.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::{ModuleIndexError, ModuleMethodEntry};

/// Script dialect a module is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptDialect {
    /// 1C:Enterprise test modules (`*.bsl`).
    Bsl,
    /// OneScript step libraries (`*.os`).
    OneScript,
}

static BSL_REGISTRATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)\.ДобавитьШагВМассивТестов\([a-zA-Zа-яА-Я]+,".*","([a-zA-Zа-яА-Я]+)""#)
        .unwrap_or_else(|_| unreachable!())
});

static ONESCRIPT_REGISTRATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)ВсеШаги\.Добавить\("(.+)"\);"#).unwrap_or_else(|_| unreachable!())
});

impl ScriptDialect {
    /// File extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Bsl => "bsl",
            Self::OneScript => "os",
        }
    }

    /// Name of the exported method that registers the module's steps.
    #[must_use]
    pub fn step_list_method(self) -> &'static str {
        match self {
            Self::Bsl => "ПолучитьСписокТестов",
            Self::OneScript => "ПолучитьСписокШагов",
        }
    }

    /// Pattern whose first group captures a registered step method name.
    #[must_use]
    pub fn registration_pattern(self) -> &'static Regex {
        match self {
            Self::Bsl => &BSL_REGISTRATION_RE,
            Self::OneScript => &ONESCRIPT_REGISTRATION_RE,
        }
    }

    /// Step method names registered in `source`, in order of appearance.
    #[must_use]
    pub fn registered_steps(self, source: &str) -> Vec<String> {
        self.registration_pattern()
            .captures_iter(source)
            .filter_map(|captures| captures.get(1))
            .map(|name| name.as_str().to_owned())
            .collect()
    }
}

/// A method declared in a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDefinition {
    /// Declared name.
    pub name: String,
    /// Whether the method carries the export marker.
    pub is_exported: bool,
    /// `true` for procedures, `false` for functions.
    pub is_procedure: bool,
    /// 1-based header line.
    pub line: u32,
    /// 1-based end-marker line.
    pub endline: u32,
    /// Compilation directive such as `НаКлиенте`, without the `&`.
    pub context: Option<String>,
    /// Comment lines directly above the method, without `//`.
    pub description: String,
}

/// Methods of one module, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodTable {
    methods: Vec<MethodDefinition>,
}

impl MethodTable {
    /// Wrap an ordered list of methods.
    #[must_use]
    pub fn new(methods: Vec<MethodDefinition>) -> Self {
        Self { methods }
    }

    /// Iterate over methods in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, MethodDefinition> {
        self.methods.iter()
    }

    /// Number of methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether the module declares no methods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// First method named `name`, ignoring case.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.iter().find(|m| names_match(&m.name, name))
    }
}

impl FromIterator<MethodDefinition> for MethodTable {
    fn from_iter<I: IntoIterator<Item = MethodDefinition>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MethodTable {
    type Item = &'a MethodDefinition;
    type IntoIter = std::slice::Iter<'a, MethodDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Parses module source into a [`MethodTable`].
pub trait ModuleParser: Send + Sync {
    /// Parse `source`.
    ///
    /// # Errors
    ///
    /// Returns a [`ModuleIndexError`] when the method structure is broken.
    fn parse(&self, source: &str) -> Result<MethodTable, ModuleIndexError>;
}

/// Line scanner for BSL-family method headers.
///
/// Recognises English and Russian `Procedure`/`Function` headers, their end
/// markers, a preceding `&Directive` line and a preceding `//` comment block.
/// Both BSL and OneScript share this syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct BslModuleParser;

static METHOD_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?iu)^\s*(procedure|function|процедура|функция)\s+(\w+)\s*\(")
        .unwrap_or_else(|_| unreachable!())
});

static METHOD_END_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?iu)^\s*(endprocedure|endfunction|конецпроцедуры|конецфункции)\b")
        .unwrap_or_else(|_| unreachable!())
});

static EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?iu)^\s*(export|экспорт)\b").unwrap_or_else(|_| unreachable!()));

struct OpenMethod {
    name: String,
    is_procedure: bool,
    line: u32,
    context: Option<String>,
    description: String,
    params_depth: Option<usize>,
    is_exported: bool,
}

#[derive(Default)]
struct Preamble {
    comments: Vec<String>,
    context: Option<String>,
}

impl ModuleParser for BslModuleParser {
    fn parse(&self, source: &str) -> Result<MethodTable, ModuleIndexError> {
        let mut methods = Vec::new();
        let mut preamble = Preamble::default();
        let mut open: Option<OpenMethod> = None;

        for (index, raw_line) in source.lines().enumerate() {
            let line_no = u32::try_from(index + 1).unwrap_or(u32::MAX);

            if let Some(method) = open.as_mut() {
                if method.params_depth.is_some() {
                    scan_parameters(method, raw_line);
                    continue;
                }
                if METHOD_END_RE.is_match(raw_line) {
                    if let Some(method) = open.take() {
                        methods.push(close_method(method, line_no));
                    }
                }
                continue;
            }

            if let Some(captures) = METHOD_HEADER_RE.captures(raw_line) {
                let (Some(kind), Some(name), Some(whole)) =
                    (captures.get(1), captures.get(2), captures.get(0))
                else {
                    continue;
                };
                let Preamble { comments, context } = std::mem::take(&mut preamble);
                let mut method = OpenMethod {
                    name: name.as_str().to_owned(),
                    is_procedure: is_procedure_keyword(kind.as_str()),
                    line: line_no,
                    context,
                    description: comments.join("\n"),
                    params_depth: Some(1),
                    is_exported: false,
                };
                scan_parameters(&mut method, raw_line.get(whole.end()..).unwrap_or_default());
                open = Some(method);
                continue;
            }

            let trimmed = raw_line.trim();
            if let Some(comment) = trimmed.strip_prefix("//") {
                if preamble.context.is_some() {
                    preamble = Preamble::default();
                }
                preamble.comments.push(comment.strip_prefix(' ').unwrap_or(comment).to_owned());
            } else if let Some(directive) = trimmed.strip_prefix('&') {
                preamble.context = Some(directive.trim().to_owned());
            } else {
                preamble = Preamble::default();
            }
        }

        match open {
            Some(method) => Err(ModuleIndexError::UnterminatedMethod {
                name: method.name,
                line: method.line,
            }),
            None => Ok(MethodTable::new(methods)),
        }
    }
}

fn is_procedure_keyword(keyword: &str) -> bool {
    keyword.eq_ignore_ascii_case("procedure") || keyword.to_lowercase() == "процедура"
}

/// Track parentheses of a parameter list that may span several lines, then
/// look for the export marker right after it.
fn scan_parameters(method: &mut OpenMethod, text: &str) {
    let Some(mut depth) = method.params_depth else {
        return;
    };
    let mut in_string = false;
    for (pos, ch) in text.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    let tail = text.get(pos + ch.len_utf8()..).unwrap_or_default();
                    method.is_exported = EXPORT_RE.is_match(tail);
                    method.params_depth = None;
                    return;
                }
            }
            _ => {}
        }
    }
    method.params_depth = Some(depth);
}

fn close_method(method: OpenMethod, endline: u32) -> MethodDefinition {
    MethodDefinition {
        name: method.name,
        is_exported: method.is_exported,
        is_procedure: method.is_procedure,
        line: method.line,
        endline,
        context: method.context,
        description: method.description,
    }
}

/// Module method names are compared ignoring case, as the language does.
fn names_match(left: &str, right: &str) -> bool {
    left == right || left.to_lowercase() == right.to_lowercase()
}

/// Collect the exported step methods of a module.
///
/// Returns nothing unless the dialect's step-list method is declared and
/// exported. Otherwise every exported method whose name is registered in
/// `source` is returned once, in method-table order.
#[must_use]
pub fn extract_module_snippets(
    table: &MethodTable,
    source: &str,
    dialect: ScriptDialect,
    filename: &Path,
) -> Vec<ModuleMethodEntry> {
    let lists_steps = table
        .find(dialect.step_list_method())
        .is_some_and(|method| method.is_exported);
    if !lists_steps {
        return Vec::new();
    }

    let registered = dialect.registered_steps(source);
    let mut seen: Vec<&str> = Vec::new();
    let mut entries = Vec::new();
    for method in table {
        if !method.is_exported
            || !registered.iter().any(|name| names_match(name, &method.name))
            || seen.iter().any(|name| names_match(name, &method.name))
        {
            continue;
        }
        seen.push(&method.name);
        entries.push(ModuleMethodEntry {
            name: method.name.clone(),
            is_procedure: method.is_procedure,
            is_exported: method.is_exported,
            line: method.line,
            endline: method.endline,
            context: method.context.clone(),
            description: method.description.clone(),
            filename: filename.to_path_buf(),
        });
    }
    entries
}

/// Read and index a module file.
///
/// # Errors
///
/// Returns [`ModuleIndexError::Read`] when the file cannot be read, or the
/// parser's error.
pub(crate) fn index_module_file(
    parser: &dyn ModuleParser,
    dialect: ScriptDialect,
    filename: &Path,
) -> Result<Vec<ModuleMethodEntry>, ModuleIndexError> {
    let source = std::fs::read_to_string(filename)?;
    let table = parser.parse(&source)?;
    Ok(extract_module_snippets(&table, &source, dialect, filename))
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests use explicit failures for clarity"
)]
mod tests {
    use super::*;
    use rstest::rstest;

    const BSL_MODULE: &str = concat!(
        "&НаКлиенте\n",
        "Функция ПолучитьСписокТестов(КонтекстФреймворкаBDD) Экспорт\n",
        "\tВсеТесты = Новый Массив;\n",
        "\tВанесса.ДобавитьШагВМассивТестов(ВсеТесты,\"ЯОткрываюФорму(Парам01)\",\"ЯОткрываюФорму\",\"Когда я открываю форму <Парам01>\",\"\",\"\");\n",
        "\tВанесса.ДобавитьШагВМассивТестов(ВсеТесты,\"ЯЗакрываюФорму()\",\"ЯЗакрываюФорму\",\"И я закрываю форму\",\"\",\"\");\n",
        "\tВозврат ВсеТесты;\n",
        "КонецФункции\n",
        "\n",
        "// Открывает форму по имени.\n",
        "// Параметры: Парам01 - имя формы\n",
        "&НаКлиенте\n",
        "Процедура ЯОткрываюФорму(Парам01) Экспорт\n",
        "КонецПроцедуры\n",
        "\n",
        "&НаКлиенте\n",
        "Процедура ЯЗакрываюФорму()\n",
        "КонецПроцедуры\n",
        "\n",
        "Процедура Вспомогательная() Экспорт\n",
        "КонецПроцедуры\n",
    );

    const ONESCRIPT_MODULE: &str = concat!(
        "Функция ПолучитьСписокШагов(КонтекстФреймворкаBDD) Экспорт\n",
        "\tВсеШаги = Новый Массив;\n",
        "\tВсеШаги.Добавить(\"ЯЗапускаюКоманду\");\n",
        "\tВсеШаги.Добавить(\"ЯЗапускаюКоманду\");\n",
        "\tВсеШаги.Добавить(\"КодВозвратаРавен\");\n",
        "\tВозврат ВсеШаги;\n",
        "КонецФункции\n",
        "\n",
        "Процедура КодВозвратаРавен(Знач Код) Экспорт\n",
        "КонецПроцедуры\n",
        "\n",
        "Процедура ЯЗапускаюКоманду(Знач Команда,\n",
        "\tЗнач Параметры = \"(нет)\") Экспорт\n",
        "КонецПроцедуры\n",
    );

    #[test]
    fn parses_headers_directives_and_comments() {
        let table = BslModuleParser.parse(BSL_MODULE).expect("valid module");
        let names: Vec<_> = table.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ПолучитьСписокТестов",
                "ЯОткрываюФорму",
                "ЯЗакрываюФорму",
                "Вспомогательная"
            ]
        );

        let list = table.find("получитьсписоктестов").expect("list method");
        assert!(list.is_exported);
        assert!(!list.is_procedure);
        assert_eq!((list.line, list.endline), (2, 7));
        assert_eq!(list.context.as_deref(), Some("НаКлиенте"));

        let open = table.find("ЯОткрываюФорму").expect("open method");
        assert!(open.is_procedure);
        assert_eq!(
            open.description,
            "Открывает форму по имени.\nПараметры: Парам01 - имя формы"
        );
        assert_eq!((open.line, open.endline), (12, 13));

        let close = table.find("ЯЗакрываюФорму").expect("close method");
        assert!(!close.is_exported);
        assert!(close.description.is_empty());
    }

    #[test]
    fn parses_english_headers_and_multiline_parameters() {
        let table = BslModuleParser
            .parse(concat!(
                "Procedure Setup(First,\n",
                "    Second = \")\") Export\n",
                "EndProcedure\n",
                "Function Value()\n",
                "    Return 1;\n",
                "EndFunction\n",
            ))
            .expect("valid module");
        let summary: Vec<_> = table
            .iter()
            .map(|m| (m.name.as_str(), m.is_exported, m.is_procedure, m.line, m.endline))
            .collect();
        assert_eq!(
            summary,
            vec![("Setup", true, true, 1, 3), ("Value", false, false, 4, 6)]
        );
    }

    #[test]
    fn unterminated_methods_are_reported() {
        let result = BslModuleParser.parse("Процедура Сломана()\n\tА = 1;\n");
        assert!(matches!(
            result,
            Err(ModuleIndexError::UnterminatedMethod { ref name, line: 1 }) if name == "Сломана"
        ));
    }

    #[test]
    fn bsl_extraction_keeps_registered_exported_methods() {
        let table = BslModuleParser.parse(BSL_MODULE).expect("valid module");
        let entries =
            extract_module_snippets(&table, BSL_MODULE, ScriptDialect::Bsl, Path::new("steps.bsl"));
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["ЯОткрываюФорму"]);
        let entry = entries.first().expect("entry");
        assert_eq!(entry.filename, Path::new("steps.bsl"));
        assert_eq!(entry.context.as_deref(), Some("НаКлиенте"));
    }

    #[test]
    fn onescript_extraction_deduplicates_in_table_order() {
        let table = BslModuleParser.parse(ONESCRIPT_MODULE).expect("valid module");
        let entries = extract_module_snippets(
            &table,
            ONESCRIPT_MODULE,
            ScriptDialect::OneScript,
            Path::new("steps.os"),
        );
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["КодВозвратаРавен", "ЯЗапускаюКоманду"]);
    }

    #[rstest]
    #[case::wrong_dialect(BSL_MODULE, ScriptDialect::OneScript)]
    #[case::list_not_exported(
        concat!(
            "Функция ПолучитьСписокШагов()\n",
            "\tВсеШаги.Добавить(\"Шаг\");\n",
            "КонецФункции\n",
            "Процедура Шаг() Экспорт\n",
            "КонецПроцедуры\n",
        ),
        ScriptDialect::OneScript
    )]
    fn modules_without_an_exported_step_list_yield_nothing(
        #[case] source: &str,
        #[case] dialect: ScriptDialect,
    ) {
        let table = BslModuleParser.parse(source).expect("valid module");
        assert!(extract_module_snippets(&table, source, dialect, Path::new("m")).is_empty());
    }

    #[test]
    fn registration_patterns_ignore_case() {
        let source = "всешаги.добавить(\"Шаг\");\n";
        assert_eq!(
            ScriptDialect::OneScript.registered_steps(source),
            vec!["Шаг".to_string()]
        );
    }
}
