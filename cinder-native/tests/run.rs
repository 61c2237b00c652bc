use std::fs;
use std::process::Command;

use cinder_core::{
    CompilePhase, CoreError, ExecutionError, LinkUnit, Session, SessionBuilder, Severity,
};
use cinder_native::CcToolchain;
use tempfile::tempdir;

fn builder() -> SessionBuilder<CcToolchain> {
    Session::builder(CcToolchain::detect().expect("C compiler on PATH"))
}

fn session() -> Session<CcToolchain> {
    builder().build().expect("session")
}

fn compile_error(err: CoreError) -> cinder_core::CompileError {
    match err {
        CoreError::Compile(err) => err,
        other => panic!("expected compile error, got {other:?}"),
    }
}

#[test]
fn runs_inline_main() {
    let unit = LinkUnit::code("int main(void) { return(123456); }");
    assert_eq!(session().run([unit]).expect("run"), 123456);
}

#[test]
fn runs_source_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("filename.c");
    fs::write(&path, "int main(void) { return(123456); }").expect("write source");

    let session = session();
    assert_eq!(session.run([LinkUnit::file(&path)]).expect("run"), 123456);
    let as_string = path.to_str().expect("utf-8 path");
    assert_eq!(session.run([as_string]).expect("run"), 123456);
}

#[test]
fn links_across_units() {
    let caller = LinkUnit::code("extern int f(void); int main(void) { return(f()); }");
    let callee = LinkUnit::code("int f(void) { return(4321); }");
    assert_eq!(session().run([caller, callee]).expect("run"), 4321);
}

#[test]
fn compiles_with_unit_defines() {
    let unit = LinkUnit::code_builder("int main(void) { return(DEF1 + DEF2); }")
        .defines([("DEF1", "12")])
        .define("DEF2", 34)
        .build()
        .expect("unit");
    assert_eq!(session().run([unit]).expect("run"), 12 + 34);
}

#[test]
fn flag_define_is_one() {
    let unit = LinkUnit::code_builder("#if DEF != 1\n#error B\n#endif\nint main(void) { return 0; }")
        .define_flag("DEF")
        .build()
        .expect("unit");
    assert_eq!(session().run([unit]).expect("run"), 0);
}

#[test]
fn unit_defines_stay_in_their_unit() {
    let first = LinkUnit::code_builder("#ifdef A\n#error A defined\n#endif\n")
        .define("B", 1)
        .build()
        .expect("unit");
    let second = LinkUnit::code_builder("#ifdef B\n#error B defined\n#endif\n")
        .define("A", 1)
        .build()
        .expect("unit");
    let main = LinkUnit::code("int main(void) { return 0; }");
    assert_eq!(session().run([first, second, main]).expect("run"), 0);
}

#[test]
fn compiles_with_session_defines() {
    let session = builder()
        .defines([("DEF1", "12")])
        .define("DEF2", 34)
        .build()
        .expect("session");
    let unit = LinkUnit::code("int main(void) { return(DEF1 + DEF2); }");
    assert_eq!(session.run([unit]).expect("run"), 12 + 34);
}

#[test]
fn session_define_returns_after_unit_override() {
    let session = builder().define("DEF", 1).build().expect("session");
    let first = LinkUnit::code_builder("#if DEF != 2\n#error inv. DEF\n#endif\n")
        .define("DEF", 2)
        .build()
        .expect("unit");
    let second = LinkUnit::code("#if DEF != 1\n#error inv. DEF\n#endif\n");
    let main = LinkUnit::code("int main(void) { return DEF; }");
    assert_eq!(session.run([first, second, main]).expect("run"), 1);
}

#[test]
fn include_dir_resolves_quoted_include() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("incl.h"), "#define DEF  123\n").expect("write header");
    let session = builder().include_dir(dir.path()).build().expect("session");
    let unit = LinkUnit::code("#include \"incl.h\"\nint main(void) { return(DEF); }");
    assert_eq!(session.run([unit]).expect("run"), 123);
}

#[test]
fn sys_include_dir_resolves_quoted_include() {
    let dir = tempdir().expect("tempdir");
    fs::write(dir.path().join("incl.h"), "#define DEF  123\n").expect("write header");
    let session = builder()
        .sys_include_dir(dir.path())
        .build()
        .expect("session");
    let unit = LinkUnit::code("#include \"incl.h\"\nint main(void) { return(DEF); }");
    assert_eq!(session.run([unit]).expect("run"), 123);
}

#[test]
fn library_dir_resolves_linked_archive() {
    let dir = tempdir().expect("tempdir");
    let source = dir.path().join("helper.c");
    let object = dir.path().join("helper.o");
    fs::write(&source, "int helper(void) { return 99; }\n").expect("write helper");

    let toolchain = CcToolchain::detect().expect("C compiler on PATH");
    let status = Command::new(toolchain.program())
        .args(["-c", "-fPIC", "-o"])
        .arg(&object)
        .arg(&source)
        .status()
        .expect("spawn cc");
    assert!(status.success());
    let status = Command::new("ar")
        .arg("rcs")
        .arg(dir.path().join("libhelper.a"))
        .arg(&object)
        .status()
        .expect("spawn ar");
    assert!(status.success());

    let session = Session::builder(toolchain)
        .library_dir(dir.path())
        .options(["lhelper"])
        .build()
        .expect("session");
    let unit = LinkUnit::code("extern int helper(void); int main(void) { return helper(); }");
    assert_eq!(session.run([unit]).expect("run"), 99);
}

#[test]
fn missing_include_is_a_located_error() {
    let unit = LinkUnit::code("#include \"does_not_exist.h\"\nint main(void) { return 0; }");
    let err = compile_error(session().run([unit]).unwrap_err());
    assert_eq!(err.filename(), Some("<string>"));
    assert_eq!(err.lineno(), Some(1));
    assert_eq!(err.severity(), Some(Severity::Error));
    assert!(err.text().contains("does_not_exist.h"));
}

const REDEFINING: &str = "#define REDEF 1\n#define REDEF 2\n#define REDEF 3\nint main(void) { return 0; }";

#[test]
fn werror_rejects_warnings() {
    let session = builder().arg("Werror").build().expect("session");
    let err = compile_error(session.run([LinkUnit::code(REDEFINING)]).unwrap_err());
    assert_eq!(err.phase(), CompilePhase::Compile);
    assert!(err.text().contains("REDEF"));
}

#[test]
fn build_keeps_warnings() {
    let mut binary = session()
        .build([LinkUnit::code(REDEFINING)])
        .expect("build");
    let warnings: Vec<_> = binary
        .warnings()
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].text.contains("REDEF"));
    assert_eq!(warnings[0].lineno, 2);
    assert_eq!(binary.run().expect("run"), 0);
}

#[test]
fn error_directive_text_reaches_compile_error() {
    let err = compile_error(session().run([LinkUnit::code("#error ERRORMSG")]).unwrap_err());
    assert!(err.to_string().contains("ERRORMSG"));
    assert_eq!(err.filename(), Some("<string>"));
    assert_eq!(err.lineno(), Some(1));
}

#[test]
fn unresolved_symbol_fails_at_link() {
    let unit = LinkUnit::code("extern int missing(void); int main(void) { return missing(); }");
    let err = compile_error(session().run([unit]).unwrap_err());
    assert_eq!(err.phase(), CompilePhase::Link);
    assert!(err.to_string().contains("missing"));
}

#[test]
fn image_without_main_cannot_execute() {
    let err = session()
        .run([LinkUnit::code("int f(void) { return 1; }")])
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Execution(ExecutionError::MissingEntryPoint { .. })
    ));
}

#[test]
fn missing_source_file_is_a_compile_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("absent.c");
    let err = compile_error(session().run([LinkUnit::file(&path)]).unwrap_err());
    assert_eq!(err.filename(), None);
    assert!(err.text().contains("absent.c"));
}

#[test]
fn session_runs_repeatedly() {
    let session = session();
    let unit = LinkUnit::code_builder("int main(void) { return VALUE; }")
        .define("VALUE", 7)
        .build()
        .expect("unit");
    assert_eq!(session.run([unit.clone()]).expect("first run"), 7);
    assert_eq!(session.run([unit]).expect("second run"), 7);

    let err = session
        .run([LinkUnit::code("int main(void) { return VALUE; }")])
        .unwrap_err();
    assert!(matches!(err, CoreError::Compile(_)));
}

#[test]
fn file_unit_warning_with_colon_digits_still_runs() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("meet.c");
    fs::write(&path, "#warning meet at 10:30: sharp\nint main(void) { return 7; }\n")
        .expect("write source");

    let mut binary = session().build([LinkUnit::file(&path)]).expect("build");
    let warning = binary
        .warnings()
        .iter()
        .find(|diagnostic| diagnostic.severity == Severity::Warning)
        .expect("warning");
    assert_eq!(warning.filename, path.to_str().expect("utf-8 path"));
    assert_eq!(warning.lineno, 1);
    assert!(warning.text.contains("10:30: sharp"));
    assert_eq!(binary.run().expect("run"), 7);
}

#[cfg(target_os = "linux")]
#[test]
fn unit_definition_wins_over_libc_symbol() {
    let caller = LinkUnit::code("extern int rand(void); int main(void) { return rand(); }");
    let callee = LinkUnit::code("int rand(void) { return 4321; }");
    assert_eq!(session().run([caller, callee]).expect("run"), 4321);
}

#[test]
fn image_lives_until_binary_is_dropped() {
    let mut binary = session()
        .build([LinkUnit::code("int main(void) { return 5; }")])
        .expect("build");
    let image = binary.image().path().to_path_buf();
    assert!(image.is_file());
    assert_eq!(binary.run().expect("run"), 5);
    drop(binary);
    assert!(!image.exists());
}
