//! Capture page served at `/`.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Packaging Material Scanner</title>
    <style>
        body { font-family: system-ui, sans-serif; max-width: 720px; margin: 0 auto; padding: 16px; }
        .row { display: flex; flex-wrap: wrap; gap: 8px; margin: 12px 0; }
        button.active { font-weight: bold; }
        #error { color: #b00020; }
        #preview, #panel img { max-width: 100%; }
    </style>
</head>
<body>
    <h1>Packaging Material Scanner</h1>
    <input type="file" id="fileInput" accept="image/*" capture="environment">
    <img id="preview" alt="">
    <p id="status"></p>
    <p id="error"></p>
    <p id="overall"></p>
    <div class="row" id="materials"></div>
    <div class="row" id="properties"></div>
    <div id="panel"></div>

    <script>
        const PROPERTIES = [
            ["chemical", "Chemical Structure"], ["fssai", "FSSAI Limits"], ["bis", "BIS Standards"],
            ["thickness", "Thickness"], ["gsm", "GSM"], ["applications", "Food Applications"],
            ["resin", "Resin Code"],
        ];
        const $ = (id) => document.getElementById(id);
        let materials = [];

        $("fileInput").addEventListener("change", (e) => {
            const file = e.target.files[0];
            if (!file) return;
            const reader = new FileReader();
            reader.onload = () => analyze(reader.result);
            reader.readAsDataURL(file);
        });

        async function analyze(dataUrl) {
            $("preview").src = dataUrl;
            $("status").textContent = "Analyzing...";
            $("error").textContent = "";
            ["materials", "properties", "panel", "overall"].forEach((id) => $(id).innerHTML = "");
            try {
                const res = await fetch("/functions/v1/analyze-packaging", {
                    method: "POST",
                    headers: { "Content-Type": "application/json" },
                    body: JSON.stringify({ imageBase64: dataUrl }),
                });
                const body = await res.json();
                if (!res.ok) throw new Error(body.error || "Analysis failed");
                materials = body.materials;
                $("overall").textContent = body.overallAnalysis || "";
                showMaterials();
                $("status").textContent = "Analysis complete";
            } catch (err) {
                $("status").textContent = "";
                $("error").textContent = err.message;
            }
        }

        function showMaterials() {
            materials.forEach((m, i) => {
                const btn = document.createElement("button");
                btn.textContent = m.type;
                btn.onclick = () => showProperties(i);
                $("materials").appendChild(btn);
            });
        }

        function showProperties(index) {
            const material = materials[index];
            $("properties").innerHTML = "";
            $("panel").innerHTML = "";
            PROPERTIES
                .filter(([id]) => id !== "resin" || material.plasticResinCode != null)
                .forEach(([id, label]) => {
                    const btn = document.createElement("button");
                    btn.textContent = label;
                    btn.onclick = () => showPanel(material, id);
                    $("properties").appendChild(btn);
                });
        }

        async function showPanel(material, property) {
            const res = await fetch("/api/panels", {
                method: "POST",
                headers: { "Content-Type": "application/json" },
                body: JSON.stringify({ material, property }),
            });
            const panel = await res.json();
            const root = $("panel");
            root.innerHTML = "";
            if (!res.ok) { $("error").textContent = panel.error; return; }
            const title = document.createElement("h3");
            title.textContent = panel.title;
            root.appendChild(title);
            if (panel.image) {
                const img = document.createElement("img");
                img.src = panel.image;
                img.alt = "Chemical structure";
                root.appendChild(img);
            }
            const list = document.createElement("ul");
            panel.lines.forEach((line) => {
                const li = document.createElement("li");
                li.textContent = line;
                list.appendChild(li);
            });
            root.appendChild(list);
        }
    </script>
</body>
</html>
"#;
