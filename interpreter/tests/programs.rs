use std::fs::File;
use std::io::Read;

use jcode_interpreter::Session;
use walkdir::WalkDir;

fn run_program(name: &str, src: &str) -> String {
    let mut session = Session::new();
    match session.run(name, src) {
        Ok(value) => format!("{}\n", value),
        Err(err) => format!("{}\n", err.render()),
    }
}

#[test]
fn test_programs() {
    let source_files = WalkDir::new("tests/programs")
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| matches!(entry.path().extension(), Some(extension) if extension == "jc"))
        .filter_map(|entry| {
            let mut exp_filename = entry.file_name().to_os_string();
            exp_filename.push(".out");

            let parent = entry.path().parent().unwrap();
            let exp_filepath = parent.join(exp_filename);

            if exp_filepath.exists() {
                Some((entry, exp_filepath))
            } else {
                None
            }
        });

    let mut total = 0;

    for (src_path, exp_path) in source_files {
        println!("Running test: {}", src_path.path().display());

        let mut src_content = String::new();
        let mut exp_content = String::new();

        File::open(src_path.path())
            .unwrap()
            .read_to_string(&mut src_content)
            .unwrap();
        File::open(exp_path)
            .unwrap()
            .read_to_string(&mut exp_content)
            .unwrap();

        let name = src_path.file_name().to_string_lossy().into_owned();
        let output = run_program(&name, &src_content);

        assert_eq!(exp_content, output, "{}", src_path.path().display());
        println!("Test complete: {}", src_path.path().display());
        total += 1;
    }

    assert!(total > 0, "no programs found under tests/programs");
}
