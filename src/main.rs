fn main() {
    rex::run_cli();
}
