#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(err) = native::run() {
        eprintln!("coord_cli error: {err}");
        std::process::exit(1);
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use param_coord::coords::{AXIS_TAGS, CoordinateSystem};
    use param_coord::document::CoordinateDocument;
    use param_coord::params::SweepMode;
    use std::fmt::Write as _;
    use std::fs;
    use std::path::{Path, PathBuf};

    const USAGE: &str = r"coord_cli (param-coord)

USAGE:
  coord_cli show <file> [options]
  coord_cli sweep <file> [options]
  coord_cli normalize <file> [options]

OPTIONS (show):
  --set <name=value>   Override a parameter before evaluating (repeatable)
  --system <name>      native | cartesian | cylindrical (default: native)

OPTIONS (sweep):
  --mode <name>        nested | independent (default: nested)
  --system <name>      native | cartesian | cylindrical (default: native)

OPTIONS (normalize):
  --literal            Write evaluated numbers instead of expressions
  --out <path>         Write to this file instead of stdout
  --overwrite          Overwrite an existing output file
  -h, --help           Show this help
";

    pub fn run() -> Result<(), String> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut args = Args::new(args);

        let Some(command) = args.next() else {
            print_usage();
            return Ok(());
        };

        match command.as_str() {
            "show" => cmd_show(&mut args),
            "sweep" => cmd_sweep(&mut args),
            "normalize" => cmd_normalize(&mut args),
            "-h" | "--help" | "help" => {
                print_usage();
                Ok(())
            }
            other => Err(format!("unknown command `{other}`\n\n{USAGE}")),
        }
    }

    fn print_usage() {
        println!("{USAGE}");
    }

    fn cmd_show(args: &mut Args) -> Result<(), String> {
        let path = PathBuf::from(args.next().ok_or("missing document path")?);
        let mut overrides: Vec<(String, f64)> = Vec::new();
        let mut system = CoordinateSystem::Undefined;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--set" => overrides.push(parse_assignment(&args.value("--set")?)?),
                "--system" => system = parse_system(&args.value("--system")?)?,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        let mut document = load_document(&path)?;
        for (name, value) in &overrides {
            let applied = document.set_parameter(name, *value).map_err(|e| e.to_string())?;
            if (applied - value).abs() > f64::EPSILON {
                eprintln!("{name}: {value} aangepast naar {applied}");
            }
        }
        document.evaluate().map_err(|e| e.to_string())?;

        print!("{}", format_parameters(&document));
        print!("{}", format_coordinates(&document, system));
        Ok(())
    }

    fn cmd_sweep(args: &mut Args) -> Result<(), String> {
        let path = PathBuf::from(args.next().ok_or("missing document path")?);
        let mut mode = SweepMode::Nested;
        let mut system = CoordinateSystem::Undefined;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--mode" => mode = parse_mode(&args.value("--mode")?)?,
                "--system" => system = parse_system(&args.value("--system")?)?,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        let mut document = load_document(&path)?;
        let expected = document.parameters().borrow().count_sweep_steps(mode);
        let steps = document
            .sweep(mode, |step, doc| {
                let values = doc.parameters().borrow().parameter_value_string(", ", false);
                println!("# stap {step}: {values}");
                print!("{}", format_coordinates(doc, system));
            })
            .map_err(|e| e.to_string())?;

        eprintln!("{steps} stappen doorlopen (verwacht: {})", expected.max(1));
        Ok(())
    }

    fn cmd_normalize(args: &mut Args) -> Result<(), String> {
        let path = PathBuf::from(args.next().ok_or("missing document path")?);
        let mut literal = false;
        let mut out: Option<PathBuf> = None;
        let mut overwrite = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--literal" => literal = true,
                "--out" => out = Some(PathBuf::from(args.value("--out")?)),
                "--overwrite" => overwrite = true,
                "-h" | "--help" => {
                    print_usage();
                    return Ok(());
                }
                other => return Err(format!("unknown option `{other}`\n\n{USAGE}")),
            }
        }

        let mut document = load_document(&path)?;
        if literal {
            document.evaluate().map_err(|e| e.to_string())?;
        }
        let xml = document.to_xml_string(!literal).map_err(|e| e.to_string())?;

        match out.as_deref() {
            Some(target) => {
                write_text_file(target, &xml, overwrite)?;
                eprintln!("wrote {}", target.display());
            }
            None => println!("{xml}"),
        }
        Ok(())
    }

    fn load_document(path: &Path) -> Result<CoordinateDocument, String> {
        let xml = fs::read_to_string(path).map_err(|e| format!("read {}: {e}", path.display()))?;
        CoordinateDocument::parse_str(&xml).map_err(|e| format!("{}: {e}", path.display()))
    }

    fn format_parameters(document: &CoordinateDocument) -> String {
        let mut out = String::new();
        for parameter in document.parameters().borrow().iter() {
            let _ = writeln!(out, "{:<12} = {}", parameter.name(), parameter.value());
        }
        out
    }

    fn format_coordinates(document: &CoordinateDocument, system: CoordinateSystem) -> String {
        let mut out = String::new();
        for named in document.coordinates() {
            let coord = &named.coord;
            let shown = system.or(coord.coordinate_system());
            let values = coord.coords(system);
            let _ = write!(out, "{:<12} [{shown}]", named.name);
            for (axis, value) in AXIS_TAGS.iter().zip(values) {
                let _ = write!(out, " {axis}={value:.6}");
            }
            let terms: Vec<String> = (0..3)
                .filter_map(|index| coord.scalar(index))
                .filter(|scalar| scalar.is_parameterised())
                .map(|scalar| scalar.value_string())
                .collect();
            if !terms.is_empty() {
                let _ = write!(out, "  ({})", terms.join("; "));
            }
            out.push('\n');
        }
        out
    }

    fn parse_assignment(text: &str) -> Result<(String, f64), String> {
        let (name, value) = text
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got `{text}`"))?;
        let value = value
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid value for `{}`: {e}", name.trim()))?;
        Ok((name.trim().to_owned(), value))
    }

    fn parse_system(text: &str) -> Result<CoordinateSystem, String> {
        CoordinateSystem::from_name(text).ok_or_else(|| format!("unknown coordinate system `{text}`"))
    }

    fn parse_mode(text: &str) -> Result<SweepMode, String> {
        match text.trim().to_ascii_lowercase().as_str() {
            "nested" => Ok(SweepMode::Nested),
            "independent" => Ok(SweepMode::Independent),
            other => Err(format!("unknown sweep mode `{other}`")),
        }
    }

    fn write_text_file(path: &Path, text: &str, overwrite: bool) -> Result<(), String> {
        if path.exists() && !overwrite {
            return Err(format!(
                "refusing to overwrite existing file {} (use --overwrite)",
                path.display()
            ));
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| format!("create dir {}: {e}", parent.display()))?;
        }
        let mut contents = text.replace("\r\n", "\n");
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        fs::write(path, contents).map_err(|e| format!("write {}: {e}", path.display()))
    }

    struct Args {
        args: Vec<String>,
        pos: usize,
    }

    impl Args {
        fn new(args: Vec<String>) -> Self {
            Self { args, pos: 0 }
        }

        fn next(&mut self) -> Option<String> {
            let arg = self.args.get(self.pos)?.clone();
            self.pos += 1;
            Some(arg)
        }

        fn value(&mut self, flag: &str) -> Result<String, String> {
            self.next().ok_or_else(|| format!("missing value for {flag}"))
        }
    }
}
