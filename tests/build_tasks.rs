// tests/build_tasks.rs

use std::error::Error;
use std::sync::Arc;

use pagewright::exec::RealExecutorBackend;
use pagewright::fs::mock::MockFileSystem;
use pagewright::pipeline::Pipeline;
use pagewright::run_once;
use pagewright::tasks::{self, TaskContext};
use pagewright::types::TaskKind;
use pagewright_test_utils::{ProjectBuilder, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const MAIN_SCSS: &str = "$accent: #336699;\n\nbody {\n  a {\n    color: $accent;\n  }\n}\n";
const VARS_SCSS: &str = "$gap: 4px;\n";
const MAIN_JS: &str = "const square = (n) => n ** 2;\n\nconsole.log(square(3));\n";
const NAV_JS: &str = "const items = [1, 2, 3];\nfor (const item of items) {\n  console.log(`item ${item}`);\n}\n";

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>{{ title }}</title>
    <!-- build:css assets/styles/site.css -->
    <link rel="stylesheet" href="assets/styles/main.css">
    <!-- endbuild -->
  </head>
  <body>
    <h1>{{ title }}</h1>
    <!-- build:js assets/scripts/app.js -->
    <script src="assets/scripts/main.js"></script>
    <script src="assets/scripts/nav.js"></script>
    <!-- endbuild -->
  </body>
</html>
"#;

fn site() -> ProjectBuilder {
    ProjectBuilder::new()
        .style("main.scss", MAIN_SCSS)
        .style("_vars.scss", VARS_SCSS)
        .script("main.js", MAIN_JS)
        .script("nav.js", NAV_JS)
        .page("index.html", INDEX_HTML)
        .page("about.html", "<p>{{ title }} / about</p>\n")
        .file("src/assets/images/logo.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"/>")
        .file("src/assets/fonts/body.woff2", [0u8, 1, 2, 3])
        .file("public/robots.txt", "User-agent: *\n")
        .configure(|cfg| {
            cfg.data.insert("title".into(), "Home".into());
        })
}

#[test]
fn clean_twice_succeeds() -> TestResult {
    let project = ProjectBuilder::new()
        .file("dist/index.html", "old")
        .file("temp/assets/styles/main.css", "old")
        .build();
    let ctx = project.context();

    tasks::run(TaskKind::Clean, &ctx)?;
    assert!(!project.path("dist").exists());
    assert!(!project.path("temp").exists());

    tasks::run(TaskKind::Clean, &ctx)?;
    Ok(())
}

#[test]
fn clean_leaves_sources_alone() -> TestResult {
    let project = ProjectBuilder::new().build();
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/index.html", "<p>hi</p>");
    fs.add_file("/site/dist/index.html", "<p>hi</p>");
    fs.add_file("/site/temp/assets/scripts/main.js", "run();");
    let ctx = TaskContext::new(Arc::clone(&project.config), "/site", Arc::new(fs.clone()));

    tasks::run(TaskKind::Clean, &ctx)?;
    tasks::run(TaskKind::Clean, &ctx)?;
    assert_eq!(fs.file_paths(), vec![std::path::PathBuf::from("/site/src/index.html")]);
    Ok(())
}

#[test]
fn compile_writes_one_output_per_source() -> TestResult {
    let project = site().build();
    let ctx = project.context();

    for kind in [TaskKind::Style, TaskKind::Script, TaskKind::Page] {
        tasks::run(kind, &ctx)?;
    }

    assert_eq!(
        project.files_under("temp"),
        vec![
            "about.html",
            "assets/scripts/main.js",
            "assets/scripts/nav.js",
            "assets/styles/main.css",
            "index.html",
        ]
    );

    let css = project.read("temp/assets/styles/main.css");
    assert!(css.contains("body a"), "nested rules flattened: {css}");
    assert!(css.contains("#336699"));

    let js = project.read("temp/assets/scripts/main.js");
    assert!(!js.contains("**"), "exponent lowered: {js}");

    assert!(project.read("temp/about.html").contains("Home / about"));
    Ok(())
}

#[test]
fn template_error_fails_the_page_task() {
    let project = ProjectBuilder::new()
        .page("index.html", "{% if %}")
        .build();
    assert!(tasks::run(TaskKind::Page, &project.context()).is_err());
}

#[test]
fn pages_glob_may_use_any_extension() -> TestResult {
    let project = ProjectBuilder::new()
        .page("index.htm", "<p>{{ title }}</p>\n")
        .page("layouts/base.html", "<main>{% block body %}{% endblock %}</main>\n")
        .page("about.htm", "{% extends \"layouts/base.html\" %}{% block body %}{{ title }} / about{% endblock %}\n")
        .configure(|cfg| {
            cfg.build.paths.pages = "*.htm".into();
            cfg.data.insert("title".into(), "Home".into());
        })
        .build();

    tasks::run(TaskKind::Page, &project.context())?;

    assert_eq!(project.files_under("temp"), vec!["about.htm", "index.htm"]);
    assert_eq!(project.read("temp/index.htm"), "<p>Home</p>\n");
    assert!(project.read("temp/about.htm").contains("<main>Home / about</main>"));
    Ok(())
}

#[test]
fn assets_and_public_go_straight_to_dist() -> TestResult {
    let project = site().build();
    let ctx = project.context();

    for kind in [TaskKind::Image, TaskKind::Font, TaskKind::Extra] {
        tasks::run(kind, &ctx)?;
    }

    assert_eq!(
        project.files_under("dist"),
        vec!["assets/fonts/body.woff2", "assets/images/logo.svg", "robots.txt"]
    );
    assert_eq!(std::fs::read(project.path("dist/assets/fonts/body.woff2"))?, vec![0u8, 1, 2, 3]);
    assert!(!project.path("temp").exists());
    Ok(())
}

#[test]
fn useref_emits_one_bundle_per_block() -> TestResult {
    let a = "function greet(name) {\n    return 'hello ' + name;\n}\n\ngreet('a');\n";
    let b = "var   counter   =   0;\n\n\ncounter   +=   1;\n";
    let css = ".header {\n    margin : 0px ;\n    padding : 0px ;\n}\n";
    let page = r#"<html><head>
<!-- build:css styles/all.css -->
<link rel="stylesheet" href="/styles/base.css">
<!-- endbuild -->
</head><body>
<!-- build:js scripts/all.js -->
<script src="/scripts/a.js"></script>
<script src="/scripts/b.js"></script>
<!-- endbuild -->
</body></html>
"#;
    let project = ProjectBuilder::new()
        .file("temp/index.html", page)
        .file("temp/scripts/a.js", a)
        .file("temp/scripts/b.js", b)
        .file("temp/styles/base.css", css)
        .build();

    tasks::run(TaskKind::Useref, &project.context())?;

    let files = project.files_under("dist");
    assert_eq!(files.iter().filter(|f| f.ends_with(".js")).count(), 1);
    assert_eq!(files.iter().filter(|f| f.ends_with(".css")).count(), 1);

    let bundle_js = project.read("dist/scripts/all.js");
    assert!(bundle_js.len() < a.len() + b.len(), "{bundle_js}");
    let greet = bundle_js.find("function greet(").unwrap_or_else(|| panic!("greet dropped: {bundle_js}"));
    let counter = bundle_js.find("counter").unwrap_or_else(|| panic!("counter dropped: {bundle_js}"));
    assert!(greet < counter, "inputs keep their order: {bundle_js}");
    assert!(bundle_js.contains("hello"), "{bundle_js}");

    let bundle_css = project.read("dist/styles/all.css");
    assert!(bundle_css.len() < css.len(), "{bundle_css}");
    assert!(bundle_css.contains(".header"), "{bundle_css}");
    assert!(bundle_css.contains("padding:0"), "{bundle_css}");

    let html = project.read("dist/index.html");
    assert!(html.contains("scripts/all.js"));
    assert!(!html.contains("/scripts/a.js"));
    assert!(!html.contains("<!--"));
    Ok(())
}

#[test]
fn bundled_globals_stay_callable_from_the_page() -> TestResult {
    let lib = "function greet(name) {\n    return 'hi ' + name;\n}\n";
    let page = r#"<html><body>
<!-- build:js app.js -->
<script src="/lib.js"></script>
<!-- endbuild -->
<script>greet('x');</script>
</body></html>
"#;
    let project = ProjectBuilder::new()
        .file("temp/index.html", page)
        .file("temp/lib.js", lib)
        .build();

    tasks::run(TaskKind::Useref, &project.context())?;

    let bundle = project.read("dist/app.js");
    assert!(bundle.contains("function greet("), "{bundle}");
    assert!(bundle.contains("hi "), "{bundle}");
    assert!(project.read("dist/index.html").contains("greet("));
    Ok(())
}

#[test]
fn useref_fails_on_a_missing_reference() {
    let page = "<!-- build:js app.js -->\n<script src=\"gone.js\"></script>\n<!-- endbuild -->\n";
    let project = ProjectBuilder::new().file("temp/index.html", page).build();
    assert!(tasks::run(TaskKind::Useref, &project.context()).is_err());
}

#[tokio::test]
async fn build_produces_a_deployable_dist() -> TestResult {
    init_tracing();
    let project = site().file("dist/stale.txt", "left over").build();
    let ctx = Arc::new(project.context());

    let report = with_timeout(run_once(&Pipeline::build(), |tx| {
        RealExecutorBackend::new(tx, Arc::clone(&ctx))
    }))
    .await?;
    assert!(report.is_success());

    let files = project.files_under("dist");
    assert!(!files.contains(&"stale.txt".to_string()), "clean ran first: {files:?}");
    for expected in [
        "about.html",
        "assets/fonts/body.woff2",
        "assets/images/logo.svg",
        "assets/scripts/app.js",
        "assets/styles/site.css",
        "index.html",
        "robots.txt",
    ] {
        assert!(files.contains(&expected.to_string()), "missing {expected}: {files:?}");
    }

    let index = project.read("dist/index.html");
    assert!(index.contains("assets/scripts/app.js"));
    assert!(index.contains("assets/styles/site.css"));
    assert!(index.contains("Home"));
    Ok(())
}
