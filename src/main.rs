use agentstorm::error::AppResult;

fn main() -> AppResult<()> {
    agentstorm::run()
}
