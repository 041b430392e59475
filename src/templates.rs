use std::sync::OnceLock;
use tera::Tera;

static TERA: OnceLock<Tera> = OnceLock::new();

const INDEX: &str = include_str!("../templates/index.html");

pub fn get_tera() -> &'static Tera {
    TERA.get_or_init(|| {
        let mut tera = Tera::default();
        tera.add_raw_template("index.html", INDEX)
            .expect("Failed to load templates");
        tera
    })
}
