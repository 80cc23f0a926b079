pub async fn index() -> &'static str {
    "Welcome to the Chest X-ray Detection API (EfficientNet)! Use /predict to upload an image."
}
