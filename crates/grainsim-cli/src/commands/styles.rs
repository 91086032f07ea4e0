use crate::error::Result;
use grainsim::core::contact::styles;

pub fn run() -> Result<()> {
    println!("{}", render());
    Ok(())
}

fn render() -> String {
    let mut out = format!("{:<12} {:>4}  {:<12} {}", "STYLE", "ID", "CATEGORY", "HISTORY");
    for (name, descriptor) in styles::registered() {
        out.push_str(&format!(
            "\n{:<12} {:>4}  {:<12} {}",
            name,
            descriptor.id,
            descriptor.category.to_string(),
            descriptor.history_values
        ));
    }
    out
}
